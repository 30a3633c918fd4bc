//! Export worker
//!
//! Runs on a short-lived task spawned by the coordinator. Issues one
//! `batch_write` for the whole payload; sheets the batch reports as failed
//! go through the per-sheet fallback in the same cycle. The worker never
//! retries on its own: classification and scheduling belong to the
//! coordinator.

use sheetsync_core::codec;
use sheetsync_core::domain::{ContentHash, Grid, SheetName};
use sheetsync_core::ports::{IRemoteStore, RemoteError, SyncPayload};
use tracing::{debug, info, warn};

/// A sheet that could not be written this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSheet {
    pub sheet: SheetName,
    pub grid: Grid,
    pub error: RemoteError,
}

/// Typed result posted back to the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Sheets now holding the payload, with the hash of what was written
    pub written: Vec<(SheetName, ContentHash)>,
    /// Sheets still failing after the fallback
    pub failed: Vec<FailedSheet>,
}

impl ExportOutcome {
    /// Returns true if every sheet was written
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn written_sheets(&self) -> Vec<SheetName> {
        self.written.iter().map(|(sheet, _)| sheet.clone()).collect()
    }

    /// Failures that a later attempt may fix
    pub fn retryable(&self) -> impl Iterator<Item = &FailedSheet> {
        self.failed.iter().filter(|f| f.error.is_retryable())
    }

    /// Failures that will never succeed as-is
    pub fn fatal(&self) -> impl Iterator<Item = &FailedSheet> {
        self.failed.iter().filter(|f| !f.error.is_retryable())
    }
}

/// Writes `payload` to the remote store
///
/// # Arguments
/// * `store` - Remote store to write to
/// * `payload` - Full desired content of every sheet to export
///
/// # Returns
/// Which sheets were written and which still failed (with their grids, so the
/// coordinator can put retryable ones back in the queue)
pub async fn run_export(store: &dyn IRemoteStore, payload: SyncPayload) -> ExportOutcome {
    let sheets = payload.sheet_names();
    info!(sheets = ?sheets, "Exporting payload");

    let report = match store.batch_write(&payload).await {
        Ok(report) => report,
        Err(error) => {
            warn!(error = %error, sheets = ?sheets, "Batch write failed");
            return ExportOutcome {
                written: Vec::new(),
                failed: payload
                    .into_iter()
                    .map(|(sheet, grid)| FailedSheet {
                        sheet,
                        grid,
                        error: error.clone(),
                    })
                    .collect(),
            };
        }
    };

    let mut outcome = ExportOutcome::default();
    for (sheet, grid) in payload {
        let Some(reason) = report
            .failed
            .iter()
            .find(|(name, _)| *name == sheet)
            .map(|(_, e)| e)
        else {
            outcome.written.push((sheet.clone(), codec::hash(&grid)));
            continue;
        };

        debug!(sheet = %sheet, reason = %reason, "Sheet failed in batch, writing individually");
        match write_with_fallback(store, &sheet, &grid).await {
            Ok(()) => {
                info!(sheet = %sheet, rows = grid.row_count(), "Sheet written via fallback");
                let hash = codec::hash(&grid);
                outcome.written.push((sheet, hash));
            }
            Err(error) => {
                warn!(sheet = %sheet, error = %error, "Per-sheet fallback failed");
                outcome.failed.push(FailedSheet { sheet, grid, error });
            }
        }
    }

    outcome
}

/// Writes one sheet without relying on the batch endpoint
///
/// Creates the sheet if needed and clears it first when it holds more rows
/// or columns than the new grid, so no stale cells survive a shrink.
///
/// # Errors
/// Returns the first remote error encountered
pub async fn write_with_fallback(
    store: &dyn IRemoteStore,
    sheet: &SheetName,
    grid: &Grid,
) -> Result<(), RemoteError> {
    store
        .ensure_sheet(sheet, grid.row_count().max(1), grid.col_count().max(1))
        .await?;

    let (existing_rows, existing_cols) = store
        .fetch_sheet(sheet)
        .await?
        .map_or((0, 0), |existing| (existing.row_count(), existing.col_count()));
    if existing_rows > grid.row_count() || existing_cols > grid.col_count() {
        debug!(
            sheet = %sheet,
            existing_rows,
            existing_cols,
            new_rows = grid.row_count(),
            new_cols = grid.col_count(),
            "Clearing before shrink"
        );
        store.clear_sheet(sheet).await?;
    }

    store.write_sheet(sheet, grid).await
}
