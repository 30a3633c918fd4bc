//! Import worker
//!
//! The worker only fetches. Hash comparison and applying happen on the
//! coordinator, which owns the ledger and the apply gate.

use std::time::Duration;

use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::{IRemoteStore, RemoteError};
use tracing::{debug, warn};

/// Per-sheet result of an import request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Sheets whose remote content replaced the local collection
    pub applied: Vec<SheetName>,
    /// Sheets whose content matched a ledger hash (echo or no change)
    pub skipped: Vec<SheetName>,
    /// Sheets that do not exist remotely
    pub missing: Vec<SheetName>,
}

impl ImportReport {
    /// Returns true if nothing changed locally
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Fetched grids, in request order; `None` for missing sheets
pub type ImportFetch = Vec<(SheetName, Option<Grid>)>;

/// Fetches every requested sheet
///
/// A retryable error gets one retry after `retry_delay` (or the server's
/// `Retry-After` when longer).
///
/// # Errors
/// Returns the error of the first sheet that still fails
pub async fn fetch_all(
    store: &dyn IRemoteStore,
    sheets: &[SheetName],
    retry_delay: Duration,
) -> Result<ImportFetch, RemoteError> {
    let mut fetched = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let grid = match store.fetch_sheet(sheet).await {
            Ok(grid) => grid,
            Err(error) if error.is_retryable() => {
                let delay = error
                    .retry_after()
                    .map_or(retry_delay, |after| after.max(retry_delay));
                warn!(
                    sheet = %sheet,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Fetch failed, retrying once"
                );
                tokio::time::sleep(delay).await;
                store.fetch_sheet(sheet).await?
            }
            Err(error) => return Err(error),
        };
        debug!(
            sheet = %sheet,
            rows = grid.as_ref().map_or(0, Grid::row_count),
            "Fetched sheet"
        );
        fetched.push((sheet.clone(), grid));
    }
    Ok(fetched)
}
