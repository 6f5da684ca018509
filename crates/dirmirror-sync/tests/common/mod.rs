//! In-memory port implementations shared by the engine tests
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use dirmirror_core::domain::{
    ActionKind, FileName, LedgerChangeSet, LedgerSnapshot, SyncInstant,
};
use dirmirror_core::ports::{ILedgerStore, ILocalObserver, IRemoteConnector, RemoteError};
use dirmirror_sync::engine::SyncEngine;

pub fn name(s: &str) -> FileName {
    FileName::new(s).unwrap()
}

pub fn at(s: &str) -> SyncInstant {
    SyncInstant::parse(s).unwrap()
}

pub fn names(list: &[&str]) -> BTreeSet<FileName> {
    list.iter().map(|s| name(s)).collect()
}

// ============================================================================
// FakeRemote
// ============================================================================

#[derive(Default)]
pub struct FakeRemote {
    objects: Mutex<BTreeSet<FileName>>,
    calls: Mutex<Vec<(ActionKind, FileName)>>,
    failures: Mutex<HashMap<FileName, RemoteError>>,
    list_error: Mutex<Option<RemoteError>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn with_objects(list: &[&str]) -> Self {
        let remote = Self::default();
        *remote.objects.lock().unwrap() = names(list);
        remote
    }

    pub fn objects(&self) -> BTreeSet<FileName> {
        self.objects.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(ActionKind, FileName)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every upload or delete of `file` fails with `err` until cleared
    pub fn fail(&self, file: &str, err: RemoteError) {
        self.failures.lock().unwrap().insert(name(file), err);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn fail_list(&self, err: RemoteError) {
        *self.list_error.lock().unwrap() = Some(err);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, kind: ActionKind, file: &FileName) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push((kind, file.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.lock().unwrap().get(file) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl IRemoteConnector for FakeRemote {
    async fn list(&self) -> Result<BTreeSet<FileName>, RemoteError> {
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.objects())
    }

    async fn upload(
        &self,
        _local_path: &Path,
        name: &FileName,
        overwrite: bool,
    ) -> Result<(), RemoteError> {
        let kind = if overwrite {
            ActionKind::Overwrite
        } else {
            ActionKind::Upload
        };
        self.enter(kind, name).await?;

        let mut objects = self.objects.lock().unwrap();
        if !overwrite && objects.contains(name) {
            return Err(RemoteError::Conflict(format!("{name} already exists")));
        }
        objects.insert(name.clone());
        Ok(())
    }

    async fn delete(&self, name: &FileName) -> Result<(), RemoteError> {
        self.enter(ActionKind::Delete, name).await?;

        if self.objects.lock().unwrap().remove(name) {
            Ok(())
        } else {
            Err(RemoteError::NotFound(name.to_string()))
        }
    }
}

// ============================================================================
// FakeLocal
// ============================================================================

#[derive(Default)]
pub struct FakeLocal {
    files: Mutex<BTreeMap<FileName, SyncInstant>>,
    /// Listed, but gone by the time the modification time is read
    vanished: Mutex<BTreeSet<FileName>>,
    fail_list: Mutex<bool>,
}

impl FakeLocal {
    pub fn with_files(list: &[(&str, &str)]) -> Self {
        let local = Self::default();
        for (file, modified) in list {
            local.set(file, modified);
        }
        local
    }

    pub fn set(&self, file: &str, modified: &str) {
        self.files.lock().unwrap().insert(name(file), at(modified));
    }

    pub fn remove(&self, file: &str) {
        self.files.lock().unwrap().remove(&name(file));
    }

    pub fn vanish(&self, file: &str) {
        self.vanished.lock().unwrap().insert(name(file));
    }

    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl ILocalObserver for FakeLocal {
    async fn list(&self) -> anyhow::Result<BTreeSet<FileName>> {
        if *self.fail_list.lock().unwrap() {
            return Err(anyhow!("permission denied"));
        }
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn modified_at(&self, name: &FileName) -> anyhow::Result<Option<SyncInstant>> {
        if self.vanished.lock().unwrap().contains(name) {
            return Ok(None);
        }
        Ok(self.files.lock().unwrap().get(name).cloned())
    }

    fn path_of(&self, name: &FileName) -> PathBuf {
        PathBuf::from("/mirror").join(name.as_str())
    }
}

// ============================================================================
// FakeLedger
// ============================================================================

#[derive(Default)]
pub struct FakeLedger {
    entries: Mutex<BTreeMap<FileName, SyncInstant>>,
    failing_commits: AtomicUsize,
    commits: AtomicUsize,
    fail_read: Mutex<bool>,
}

impl FakeLedger {
    pub fn with_entries(list: &[(&str, &str)]) -> Self {
        let ledger = Self::default();
        {
            let mut entries = ledger.entries.lock().unwrap();
            for (file, instant) in list {
                entries.insert(name(file), at(instant));
            }
        }
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(n, i)| (n.clone(), i.clone()))
            .collect()
    }

    pub fn tracked(&self) -> BTreeSet<FileName> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, file: &str) -> Option<SyncInstant> {
        self.entries.lock().unwrap().get(&name(file)).cloned()
    }

    /// The next `n` commits fail without changing anything
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn fail_read(&self) {
        *self.fail_read.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl ILedgerStore for FakeLedger {
    async fn read_all(&self) -> anyhow::Result<LedgerSnapshot> {
        if *self.fail_read.lock().unwrap() {
            return Err(anyhow!("database is locked"));
        }
        Ok(self.snapshot())
    }

    async fn upsert(&self, name: &FileName, instant: &SyncInstant) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(name.clone(), instant.clone());
        Ok(())
    }

    async fn delete(&self, name: &FileName) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(name);
        Ok(())
    }

    async fn commit(&self, changes: &LedgerChangeSet) -> anyhow::Result<()> {
        let failing = self.failing_commits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_commits.store(failing - 1, Ordering::SeqCst);
            return Err(anyhow!("disk I/O error"));
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock().unwrap();
        for (name, instant) in changes.upserts() {
            entries.insert(name.clone(), instant.clone());
        }
        for name in changes.deletions() {
            entries.remove(name);
        }
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.entries.lock().unwrap().len())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub local: Arc<FakeLocal>,
    pub ledger: Arc<FakeLedger>,
}

impl Harness {
    pub fn new(remote: FakeRemote, local: FakeLocal, ledger: FakeLedger) -> Self {
        Self {
            remote: Arc::new(remote),
            local: Arc::new(local),
            ledger: Arc::new(ledger),
        }
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.remote.clone(), self.local.clone(), self.ledger.clone())
    }
}
