//! Snapshot codec
//!
//! Converts between typed records and the raw [`Grid`] representation used by
//! the remote store, and computes the content hash used for echo suppression.
//!
//! ## Canonical form
//!
//! [`hash`] digests a versioned serialization so hashes are reproducible across
//! runs and builds:
//!
//! ```text
//! sheetsync.grid.v1\n
//! {cell_count}[ {byte_len}:{bytes}]*\n      (one line per row)
//! ```
//!
//! The grid is trimmed first (trailing empty cells and trailing empty rows),
//! which is the shape the remote store reports back after a write. An export
//! and its echo therefore hash identically.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{CellValue, ContentHash, DomainError, Grid, RowReader, SheetName, SheetRecord};

/// Version tag written at the start of the canonical serialization
pub const CANONICAL_TAG: &str = "sheetsync.grid.v1";

/// Renders a number with the fixed, locale-free cell format
///
/// Integral values print without a fractional part (`100`), other finite
/// values use the shortest decimal form that round-trips (`0.1`, `-2.5`).
/// Negative zero prints as `0`. Non-finite values print as `NaN`, `inf` and
/// `-inf`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Covers -0.0
        return "0".to_string();
    }
    // f64's Display never uses exponent notation and omits ".0"
    format!("{n}")
}

/// Converts records to grids and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCodec {
    with_header: bool,
}

impl Default for SnapshotCodec {
    fn default() -> Self {
        Self { with_header: true }
    }
}

impl SnapshotCodec {
    /// Creates a codec; `with_header` controls whether the first row is a header
    pub fn new(with_header: bool) -> Self {
        Self { with_header }
    }

    /// Returns true if grids carry a header row
    pub fn with_header(&self) -> bool {
        self.with_header
    }

    /// Encodes records into a grid
    ///
    /// Rows follow the input order. The header row comes first when the codec
    /// is configured with one.
    pub fn encode<R: SheetRecord>(&self, records: &[R]) -> Grid {
        let mut rows: Vec<Vec<String>> =
            Vec::with_capacity(records.len() + usize::from(self.with_header));
        if self.with_header {
            rows.push(R::HEADER.iter().map(|h| (*h).to_string()).collect());
        }
        rows.extend(records.iter().map(|record| {
            record
                .to_cells()
                .into_iter()
                .map(CellValue::into_text)
                .collect::<Vec<_>>()
        }));
        Grid::new(rows)
    }

    /// Decodes a grid into records
    ///
    /// Short rows are padded with empty cells, cells beyond the header width
    /// are ignored and rows with no content are skipped. Decoding is
    /// all-or-nothing: the first bad cell fails the whole grid.
    ///
    /// # Arguments
    /// * `sheet` - Sheet the grid came from (used in error messages)
    /// * `grid` - Raw grid as fetched from the remote store
    ///
    /// # Errors
    /// - `DomainError::SchemaMismatch` if the header row differs from `R::HEADER`
    /// - `DomainError::InvalidCell` if a cell cannot be converted
    pub fn decode<R: SheetRecord>(
        &self,
        sheet: &SheetName,
        grid: &Grid,
    ) -> Result<Vec<R>, DomainError> {
        let rows = grid.rows();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let body_start = if self.with_header {
            check_header::<R>(sheet, &rows[0])?;
            1
        } else {
            0
        };

        let width = R::HEADER.len();
        let mut records = Vec::with_capacity(rows.len() - body_start);
        for (idx, row) in rows.iter().enumerate().skip(body_start) {
            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            let mut cells: Vec<String> = row.iter().take(width).cloned().collect();
            cells.resize(width, String::new());
            records.push(R::from_row(&RowReader::new(R::HEADER, &cells, idx + 1))?);
        }

        debug!(sheet = %sheet, records = records.len(), "Decoded grid");
        Ok(records)
    }
}

fn check_header<R: SheetRecord>(sheet: &SheetName, row: &[String]) -> Result<(), DomainError> {
    let mut found: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
    while found.last().is_some_and(String::is_empty) {
        found.pop();
    }

    let matches = found.len() >= R::HEADER.len()
        && R::HEADER
            .iter()
            .zip(found.iter())
            .all(|(expected, got)| *expected == got.as_str());

    if matches {
        Ok(())
    } else {
        Err(DomainError::SchemaMismatch {
            sheet: sheet.to_string(),
            expected: R::HEADER.iter().map(|h| (*h).to_string()).collect(),
            found,
        })
    }
}

/// Encodes records with the default codec (header row included)
pub fn encode<R: SheetRecord>(records: &[R]) -> Grid {
    SnapshotCodec::default().encode(records)
}

/// Decodes a grid with the default codec (header row expected)
///
/// # Errors
/// See [`SnapshotCodec::decode`]
pub fn decode<R: SheetRecord>(sheet: &SheetName, grid: &Grid) -> Result<Vec<R>, DomainError> {
    SnapshotCodec::default().decode(sheet, grid)
}

/// Computes the content hash of a grid's canonical serialization
pub fn hash(grid: &Grid) -> ContentHash {
    let trimmed = grid.trimmed();
    let mut hasher = Sha256::new();

    hasher.update(CANONICAL_TAG.as_bytes());
    hasher.update(b"\n");
    for row in trimmed.rows() {
        hasher.update(row.len().to_string().as_bytes());
        for cell in row {
            hasher.update(format!(" {}:", cell.len()).as_bytes());
            hasher.update(cell.as_bytes());
        }
        hasher.update(b"\n");
    }

    ContentHash::from_digest(&hasher.finalize())
}
