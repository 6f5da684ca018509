//! dirmirror Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileName`, `SyncInstant`, `LedgerSnapshot`, `LedgerChangeSet`,
//!   per-action outcomes
//! - **Port definitions** - Traits for adapters: `IRemoteConnector`, `ILedgerStore`,
//!   `ILocalObserver`
//! - **Configuration** - YAML-backed typed configuration with validation
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`dirmirror-ledger`, `dirmirror-remote`, and the filesystem adapter in
//! `dirmirror-sync`). The reconciliation engine in `dirmirror-sync` drives
//! the domain through these ports.

pub mod config;
pub mod domain;
pub mod ports;
