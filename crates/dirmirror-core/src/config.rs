//! Configuration module for dirmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for dirmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

/// Reconciliation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory mirrored to the remote root.
    pub local_dir: PathBuf,
    /// Seconds between the end of one cycle and the start of the next.
    pub poll_interval: u64,
    /// Upper bound on remote actions in flight at once (1 = sequential).
    pub max_concurrent_actions: usize,
}

/// Remote object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the resources endpoint.
    pub api_url: String,
    /// Folder on the remote side that mirrors `sync.local_dir`.
    pub root: String,
    /// OAuth token sent with every request. Required.
    pub token: Option<String>,
    /// Timeout for each API call in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for transferring one file's content in seconds.
    pub upload_timeout_secs: u64,
    /// Number of items requested per listing page.
    pub page_size: u32,
}

/// Ledger database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path to the SQLite ledger file.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional file receiving JSON-formatted log lines (appended).
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/dirmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("dirmirror")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Environment overrides and path expansion
// ---------------------------------------------------------------------------

/// Environment variables consulted by [`Config::apply_env_overrides`].
pub const ENV_LOCAL_DIR: &str = "DIRMIRROR_LOCAL_DIR";
pub const ENV_API_URL: &str = "DIRMIRROR_API_URL";
pub const ENV_REMOTE_ROOT: &str = "DIRMIRROR_REMOTE_ROOT";
pub const ENV_API_TOKEN: &str = "DIRMIRROR_API_TOKEN";
pub const ENV_LOG_FILE: &str = "DIRMIRROR_LOG_FILE";
pub const ENV_LEDGER_PATH: &str = "DIRMIRROR_LEDGER_PATH";

impl Config {
    /// Override fields from `DIRMIRROR_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override fields from any key lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get(ENV_LOCAL_DIR) {
            self.sync.local_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.remote.api_url = url;
        }
        if let Some(root) = get(ENV_REMOTE_ROOT) {
            self.remote.root = root;
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.remote.token = Some(token);
        }
        if let Some(file) = get(ENV_LOG_FILE) {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(path) = get(ENV_LEDGER_PATH) {
            self.ledger.path = PathBuf::from(path);
        }
    }

    /// Expand a leading `~` in every path field to the home directory.
    pub fn expand_paths(&mut self) {
        self.sync.local_dir = expand_tilde(&self.sync.local_dir);
        self.ledger.path = expand_tilde(&self.ledger.path);
        if let Some(file) = self.logging.file.take() {
            self.logging.file = Some(expand_tilde(&file));
        }
    }
}

/// Replace a leading `~` component with the user's home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("~/Mirror"),
            poll_interval: 5,
            max_concurrent_actions: 1,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://cloud-api.yandex.net/v1/disk/resources".to_string(),
            root: "app:/".to_string(),
            token: None,
            request_timeout_secs: 30,
            upload_timeout_secs: 3600,
            page_size: 100,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("dirmirror");
        Self {
            path: data_dir.join("ledger.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_concurrent_actions == 0 {
            errors.push(ValidationError {
                field: "sync.max_concurrent_actions".into(),
                message: "must be greater than 0".into(),
            });
        }

        // Tilde paths are checked after expansion at startup.
        let dir_str = self.sync.local_dir.to_string_lossy();
        if !dir_str.starts_with('~') && !self.sync.local_dir.is_dir() {
            errors.push(ValidationError {
                field: "sync.local_dir".into(),
                message: format!(
                    "directory does not exist: {}",
                    self.sync.local_dir.display()
                ),
            });
        }

        // --- remote ---
        if !(self.remote.api_url.starts_with("http://")
            || self.remote.api_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "remote.api_url".into(),
                message: format!(
                    "must be an http(s) URL, got '{}'",
                    self.remote.api_url
                ),
            });
        }
        if self.remote.root.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.root".into(),
                message: "must not be empty".into(),
            });
        }
        match self.remote.token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => errors.push(ValidationError {
                field: "remote.token".into(),
                message: format!("is required (set it in the config file or {ENV_API_TOKEN})"),
            }),
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.upload_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.upload_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.page_size == 0 {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- ledger ---
        if self.ledger.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "ledger.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and lets callers override individual fields.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_local_dir(mut self, dir: PathBuf) -> Self {
        self.config.sync.local_dir = dir;
        self
    }

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_max_concurrent_actions(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent_actions = n;
        self
    }

    // --- remote ---

    pub fn remote_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.api_url = url.into();
        self
    }

    pub fn remote_root(mut self, root: impl Into<String>) -> Self {
        self.config.remote.root = root.into();
        self
    }

    pub fn remote_token(mut self, token: impl Into<String>) -> Self {
        self.config.remote.token = Some(token.into());
        self
    }

    pub fn remote_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.request_timeout_secs = seconds;
        self
    }

    pub fn remote_upload_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.upload_timeout_secs = seconds;
        self
    }

    pub fn remote_page_size(mut self, n: u32) -> Self {
        self.config.remote.page_size = n;
        self
    }

    // --- ledger ---

    pub fn ledger_path(mut self, path: PathBuf) -> Self {
        self.config.ledger.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
