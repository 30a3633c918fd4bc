//! CLI command implementations
//!
//! Every command receives an [`AppContext`]. Commands that run the engine
//! build a [`Session`]: remote store, cabinet and coordinator wired together.

pub mod config;
pub mod pull;
pub mod push;
pub mod run;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sheetsync_core::codec::SnapshotCodec;
use sheetsync_core::config::Config;
use sheetsync_core::domain::{Cabinet, CabinetSnapshot, SheetName};
use sheetsync_core::ports::{AllowAll, IRemoteStore};
use sheetsync_remote::{MemoryRemoteStore, SheetsRemoteStore};
use sheetsync_sync::{CoordinatorSettings, EnqueueOutcome, SyncCoordinator, SyncEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::output::OutputFormat;

// ============================================================================
// AppContext
// ============================================================================

/// Global options plus the loaded configuration
#[derive(Debug)]
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Config,
    /// Why the file at `config_path` could not be used, if it could not
    pub load_error: Option<String>,
    pub offline: bool,
    pub format: OutputFormat,
}

impl AppContext {
    /// Loads the configuration from `path` or the default location
    ///
    /// A missing file at the default location means defaults. A missing
    /// explicit file or an unparsable one is remembered in `load_error` so
    /// `config` subcommands can still report it.
    pub fn load(path: Option<PathBuf>, offline: bool, format: OutputFormat) -> Result<Self> {
        let explicit = path.is_some();
        let config_path = path.unwrap_or_else(Config::default_path);

        let (config, load_error) = if config_path.exists() {
            match Config::load(&config_path) {
                Ok(config) => (config, None),
                Err(e) => (Config::default(), Some(format!("{e:#}"))),
            }
        } else if explicit {
            (
                Config::default(),
                Some(format!(
                    "Configuration file not found: {}",
                    config_path.display()
                )),
            )
        } else {
            (Config::default(), None)
        };

        Ok(Self {
            config_path,
            config,
            load_error,
            offline,
            format,
        })
    }

    /// Configuration for commands that run the engine
    ///
    /// # Errors
    /// Returns an error if the file could not be loaded or fails validation
    pub fn engine_config(&self) -> Result<&Config> {
        if let Some(error) = &self.load_error {
            anyhow::bail!("{error}");
        }
        let errors = self.config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!("Invalid configuration: {}", messages.join("; "));
        }
        if !self.offline && self.config.remote.spreadsheet_id.trim().is_empty() {
            anyhow::bail!(
                "remote.spreadsheet_id is not set in {} (or pass --offline)",
                self.config_path.display()
            );
        }
        Ok(&self.config)
    }
}

// ============================================================================
// Snapshot files
// ============================================================================

/// Reads a cabinet snapshot from a JSON file
pub fn read_snapshot(path: &Path) -> Result<CabinetSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes a cabinet snapshot as pretty JSON
pub fn write_snapshot(path: &Path, snapshot: &CabinetSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize records")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// Session
// ============================================================================

/// A running engine: store, cabinet and coordinator
pub struct Session {
    pub coordinator: SyncCoordinator,
    pub events: mpsc::UnboundedReceiver<SyncEvent>,
    pub cabinet: Arc<Cabinet>,
    pub sheets: Vec<SheetName>,
}

impl Session {
    /// Wires up the adapters and spawns the coordinator
    ///
    /// # Arguments
    /// * `config` - Validated configuration
    /// * `offline` - Use an in-memory store instead of the HTTP adapter
    /// * `snapshot` - Initial local records, if any
    pub fn start(config: &Config, offline: bool, snapshot: Option<CabinetSnapshot>) -> Result<Self> {
        let sheets = config
            .sync
            .sheet_names()
            .context("Invalid sync.sheets entry")?;
        let codec = SnapshotCodec::new(config.sync.include_header);

        // Step 1: Remote store
        let store: Arc<dyn IRemoteStore> = if offline {
            info!("Using in-memory remote store (offline)");
            Arc::new(MemoryRemoteStore::new())
        } else {
            info!(
                base_url = %config.remote.base_url,
                spreadsheet_id = %config.remote.spreadsheet_id,
                "Using spreadsheet REST store"
            );
            Arc::new(
                SheetsRemoteStore::from_config(&config.remote)
                    .context("Failed to create remote store")?,
            )
        };

        // Step 2: Local records
        let cabinet = Arc::new(match snapshot {
            Some(snapshot) => Cabinet::from_snapshot(codec, snapshot),
            None => Cabinet::new(codec),
        });

        // Step 3: Coordinator
        let (coordinator, events) = SyncCoordinator::spawn(
            CoordinatorSettings::from_config(config),
            codec,
            store,
            cabinet.clone(),
            Arc::new(AllowAll),
        );

        Ok(Self {
            coordinator,
            events,
            cabinet,
            sheets,
        })
    }

    /// Encodes every configured sheet from the cabinet and queues it
    ///
    /// # Returns
    /// The sheets that were queued
    pub async fn enqueue_all(&self) -> Result<BTreeSet<SheetName>> {
        let mut queued = BTreeSet::new();
        for sheet in &self.sheets {
            let grid = match self.cabinet.encode_sheet(sheet).await {
                Ok(grid) => grid,
                Err(e) => {
                    warn!(sheet = %sheet, error = %e, "Sheet has no local collection, skipped");
                    continue;
                }
            };
            match self.coordinator.enqueue_grid(sheet.clone(), grid)? {
                EnqueueOutcome::Queued => {
                    debug!(sheet = %sheet, "Queued for export");
                    queued.insert(sheet.clone());
                }
                outcome => warn!(sheet = %sheet, ?outcome, "Sheet not queued"),
            }
        }
        Ok(queued)
    }
}

/// Result of waiting for queued sheets to be exported
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportWait {
    pub written: Vec<SheetName>,
    pub failed: Vec<(SheetName, String)>,
    /// Sheets with no outcome before the timeout
    pub pending: Vec<SheetName>,
}

/// Drains events until every sheet in `outstanding` was written or failed
pub async fn wait_for_export(
    events: &mut mpsc::UnboundedReceiver<SyncEvent>,
    mut outstanding: BTreeSet<SheetName>,
    timeout: Duration,
) -> ExportWait {
    let mut result = ExportWait::default();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    while !outstanding.is_empty() {
        tokio::select! {
            event = events.recv() => match event {
                Some(SyncEvent::ExportFinished { sheets }) => {
                    for sheet in sheets {
                        if outstanding.remove(&sheet) {
                            result.written.push(sheet);
                        }
                    }
                }
                Some(SyncEvent::ExportFailed { sheets, error }) => {
                    for sheet in sheets {
                        if outstanding.remove(&sheet) {
                            result.failed.push((sheet, error.clone()));
                        }
                    }
                }
                Some(other) => debug!(event = ?other, "Ignoring event while exporting"),
                None => break,
            },
            _ = &mut deadline => {
                warn!(pending = ?outstanding, "Timed out waiting for export");
                break;
            }
        }
    }

    result.pending = outstanding.into_iter().collect();
    result
}
