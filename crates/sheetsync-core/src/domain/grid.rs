//! Raw sheet content
//!
//! A [`Grid`] is the remote store's view of a sheet: an ordered list of rows,
//! each an ordered list of text cells. Rows may be ragged; the remote store
//! trims trailing empty cells and rows, so consumers must tolerate short rows.

use serde::{Deserialize, Serialize};

/// An ordered 2-D grid of stringified cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Creates a grid from raw rows
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Creates an empty grid
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a grid from anything that converts into cell text
    ///
    /// Convenient in tests: `Grid::from_rows([["A", "100"]])`.
    pub fn from_rows<R, C>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Returns the rows
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Consumes the grid and returns its rows
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    /// Number of rows (header included)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Returns true if the grid has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a copy with trailing empty cells and trailing empty rows removed
    ///
    /// This is the shape the remote store reports back after a write.
    pub fn trimmed(&self) -> Grid {
        let mut rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let keep = row
                    .iter()
                    .rposition(|cell| !cell.is_empty())
                    .map_or(0, |idx| idx + 1);
                row[..keep].to_vec()
            })
            .collect();

        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }

        Grid { rows }
    }
}
