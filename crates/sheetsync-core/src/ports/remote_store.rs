//! Remote store port (driven/secondary port)
//!
//! This module defines the interface to the shared spreadsheet-like service
//! that holds the authoritative copy of every sheet. The HTTP adapter and the
//! in-memory test double both live in `sheetsync-remote`.
//!
//! ## Design Notes
//!
//! - Uses a typed [`RemoteError`] instead of `anyhow` because the sync engine
//!   must branch on the failure class (backoff, short retry, surface).
//! - Uses `#[async_trait]` for async trait methods.
//! - Every write carries full sheet contents. There is no row-level patching.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{Grid, SheetName};

// ============================================================================
// RemoteError
// ============================================================================

/// Failure classes reported by a remote store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service is throttling requests
    #[error("Rate limited by remote store (retry after {retry_after:?})")]
    RateLimited {
        /// Server-suggested wait, if any
        retry_after: Option<Duration>,
    },

    /// Network blip, timeout or server-side hiccup
    #[error("Transient remote error: {0}")]
    Transient(String),

    /// Authentication failure, malformed payload or other permanent error
    #[error("Fatal remote error: {0}")]
    Fatal(String),
}

impl RemoteError {
    /// Returns true if the request may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited { .. } | RemoteError::Transient(_)
        )
    }

    /// Returns true for [`RemoteError::RateLimited`]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }

    /// Server-suggested wait for rate-limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

// ============================================================================
// SyncPayload
// ============================================================================

/// Complete desired remote content for one or more sheets
///
/// Payloads are never diffs: each entry is the whole sheet. Entries are kept
/// in sheet-name order so batch requests are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPayload {
    sheets: BTreeMap<SheetName, Grid>,
}

impl SyncPayload {
    /// Creates an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a sheet's content
    pub fn insert(&mut self, sheet: SheetName, grid: Grid) -> Option<Grid> {
        self.sheets.insert(sheet, grid)
    }

    /// Content for a sheet, if present
    pub fn get(&self, sheet: &SheetName) -> Option<&Grid> {
        self.sheets.get(sheet)
    }

    /// Returns true if the payload carries the sheet
    pub fn contains(&self, sheet: &SheetName) -> bool {
        self.sheets.contains_key(sheet)
    }

    /// Sheet names in order
    pub fn sheet_names(&self) -> Vec<SheetName> {
        self.sheets.keys().cloned().collect()
    }

    /// Iterates over `(sheet, grid)` pairs in sheet-name order
    pub fn iter(&self) -> impl Iterator<Item = (&SheetName, &Grid)> {
        self.sheets.iter()
    }

    /// Number of sheets in the payload
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Returns true if the payload carries no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl FromIterator<(SheetName, Grid)> for SyncPayload {
    fn from_iter<I: IntoIterator<Item = (SheetName, Grid)>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SyncPayload {
    type Item = (SheetName, Grid);
    type IntoIter = std::collections::btree_map::IntoIter<SheetName, Grid>;

    fn into_iter(self) -> Self::IntoIter {
        self.sheets.into_iter()
    }
}

// ============================================================================
// BatchWriteReport
// ============================================================================

/// Outcome of a batch write that reached the service
///
/// An `Err` from [`IRemoteStore::batch_write`] means nothing was written.
/// An `Ok` report may still list sheets that failed individually.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteReport {
    /// Sheets that were not written, with the reason
    pub failed: Vec<(SheetName, RemoteError)>,
}

impl BatchWriteReport {
    /// A report with no failures
    pub fn success() -> Self {
        Self::default()
    }

    /// Returns true if every sheet was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns true if the sheet is listed as failed
    pub fn has_failed(&self, sheet: &SheetName) -> bool {
        self.failed.iter().any(|(name, _)| name == sheet)
    }
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the shared remote spreadsheet
///
/// ## Implementation Notes
///
/// - `fetch_sheet` reports trailing empty cells and rows trimmed, the way the
///   service stores them.
/// - `batch_write` replaces the content of every sheet it writes: no stale
///   trailing rows may survive a shrink.
/// - `write_sheet` writes from `A1` without clearing anything beyond the
///   grid's extent; callers clear first when they need replace semantics.
/// - Each call is bounded by the adapter's own request timeout.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches all cell values of a sheet
    ///
    /// # Returns
    /// `None` if the sheet does not exist
    async fn fetch_sheet(&self, sheet: &SheetName) -> Result<Option<Grid>, RemoteError>;

    /// Writes several sheets' full contents in one logical call
    ///
    /// # Returns
    /// A report listing sheets that failed individually
    ///
    /// # Errors
    /// Returns an error if the whole call failed and nothing was written
    async fn batch_write(&self, payload: &SyncPayload) -> Result<BatchWriteReport, RemoteError>;

    /// Writes a grid starting at `A1`
    async fn write_sheet(&self, sheet: &SheetName, grid: &Grid) -> Result<(), RemoteError>;

    /// Removes all values from a sheet
    async fn clear_sheet(&self, sheet: &SheetName) -> Result<(), RemoteError>;

    /// Creates the sheet if it does not exist
    ///
    /// # Arguments
    /// * `sheet` - Sheet to create
    /// * `min_rows` - Minimum row count for a newly created sheet
    /// * `min_cols` - Minimum column count for a newly created sheet
    async fn ensure_sheet(
        &self,
        sheet: &SheetName,
        min_rows: usize,
        min_cols: usize,
    ) -> Result<(), RemoteError>;
}
