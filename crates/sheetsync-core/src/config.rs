//! Configuration module for SheetSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, SheetName};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for SheetSync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub backoff: BackoffConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Synchronization engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Milliseconds to wait after the last local edit before exporting.
    pub debounce_ms: u64,
    /// Seconds between janitor passes that flush anything left pending.
    pub janitor_interval_secs: u64,
    /// Milliseconds before the single retry of a transient export failure.
    pub transient_retry_ms: u64,
    /// Whether `run` imports every configured sheet when it starts.
    pub import_on_startup: bool,
    /// Seconds between periodic imports; `0` disables them.
    pub poll_interval_secs: u64,
    /// Sheets kept in sync.
    pub sheets: Vec<String>,
    /// Whether grids carry a header row.
    pub include_header: bool,
}

/// Rate-limit backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay after a rate-limit response, in seconds.
    pub initial_secs: u64,
    /// Upper bound for the delay, in seconds.
    pub ceiling_secs: u64,
}

/// Remote spreadsheet service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root, without the `/v4` suffix.
    pub base_url: String,
    /// Identifier of the shared spreadsheet document.
    pub spreadsheet_id: String,
    /// Bearer token sent with every request. `None` for unauthenticated endpoints.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sheetsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sheetsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 3_000,
            janitor_interval_secs: 300,
            transient_retry_ms: 5_000,
            import_on_startup: true,
            poll_interval_secs: 0,
            sheets: vec![SheetName::OBJECTS.to_string(), SheetName::STATS.to_string()],
            include_header: true,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_secs: 1,
            ceiling_secs: 600,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: String::new(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    pub fn transient_retry(&self) -> Duration {
        Duration::from_millis(self.transient_retry_ms)
    }

    /// Interval between periodic imports, `None` when disabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_secs > 0).then(|| Duration::from_secs(self.poll_interval_secs))
    }

    /// Configured sheets as validated names.
    pub fn sheet_names(&self) -> Result<Vec<SheetName>, DomainError> {
        self.sheets.iter().map(|s| SheetName::new(s.as_str())).collect()
    }
}

impl BackoffConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_secs)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.ceiling_secs)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.debounce_ms"`.
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
        if self.sync.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.janitor_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.janitor_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.transient_retry_ms == 0 {
            errors.push(ValidationError {
                field: "sync.transient_retry_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.sheets.is_empty() {
            errors.push(ValidationError {
                field: "sync.sheets".into(),
                message: "at least one sheet must be configured".into(),
            });
        }
        let mut seen = HashSet::new();
        for name in &self.sync.sheets {
            if let Err(e) = SheetName::new(name.as_str()) {
                errors.push(ValidationError {
                    field: "sync.sheets".into(),
                    message: e.to_string(),
                });
            } else if !seen.insert(name.as_str()) {
                errors.push(ValidationError {
                    field: "sync.sheets".into(),
                    message: format!("duplicate sheet '{name}'"),
                });
            }
        }

        // --- backoff ---
        if self.backoff.initial_secs == 0 {
            errors.push(ValidationError {
                field: "backoff.initial_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.backoff.ceiling_secs < self.backoff.initial_secs {
            errors.push(ValidationError {
                field: "backoff.ceiling_secs".into(),
                message: format!(
                    "ceiling_secs ({}) must not be below initial_secs ({})",
                    self.backoff.ceiling_secs, self.backoff.initial_secs
                ),
            });
        }

        // --- remote ---
        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("not an http(s) URL: '{}'", self.remote.base_url),
            });
        }
        if self.remote.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
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
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use sheetsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_debounce_ms(500)
///     .remote_spreadsheet_id("1AbC")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_debounce_ms(mut self, ms: u64) -> Self {
        self.config.sync.debounce_ms = ms;
        self
    }

    pub fn sync_janitor_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.janitor_interval_secs = seconds;
        self
    }

    pub fn sync_transient_retry_ms(mut self, ms: u64) -> Self {
        self.config.sync.transient_retry_ms = ms;
        self
    }

    pub fn sync_import_on_startup(mut self, enabled: bool) -> Self {
        self.config.sync.import_on_startup = enabled;
        self
    }

    pub fn sync_poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval_secs = seconds;
        self
    }

    pub fn sync_sheets<I, S>(mut self, sheets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.sheets = sheets.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_include_header(mut self, include: bool) -> Self {
        self.config.sync.include_header = include;
        self
    }

    // --- backoff ---

    pub fn backoff_initial_secs(mut self, seconds: u64) -> Self {
        self.config.backoff.initial_secs = seconds;
        self
    }

    pub fn backoff_ceiling_secs(mut self, seconds: u64) -> Self {
        self.config.backoff.ceiling_secs = seconds;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.config.remote.spreadsheet_id = id.into();
        self
    }

    pub fn remote_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.remote.access_token = Some(token.into());
        self
    }

    pub fn remote_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.timeout_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the final [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
