//! Local records port (driving side of an import)
//!
//! The sync engine applies imported grids through this trait. It never
//! inspects records itself.

use crate::domain::{DomainError, Grid, SheetName};

/// Port trait for the in-memory record collections owned by the application
///
/// ## Implementation Notes
///
/// - `apply_remote` must be atomic per sheet: decode the whole grid first and
///   only then swap the collection. A decode error leaves the collection as
///   it was.
/// - Setters that normally enqueue exports may fire during an apply; the
///   engine suppresses them through its apply gate.
#[async_trait::async_trait]
pub trait ILocalRecords: Send + Sync {
    /// Replaces the local collection for `sheet` with the grid's records
    ///
    /// # Returns
    /// The number of records now held for the sheet
    ///
    /// # Errors
    /// - `DomainError::UnknownSheet` if no collection backs the sheet
    /// - Any decode error; the collection is left untouched
    async fn apply_remote(&self, sheet: &SheetName, grid: &Grid) -> Result<usize, DomainError>;
}
