//! Application records and their row layout
//!
//! The sync engine never interprets records. Record types describe how they
//! map onto a sheet row through [`SheetRecord`], and the codec does the rest.
//!
//! Two record kinds back the governance cabinet:
//! - [`ItemDefinition`] rows live in the `"objects"` sheet
//! - [`Transaction`] rows live in the `"stats"` sheet

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use crate::codec::format_number;

// ============================================================================
// CellValue
// ============================================================================

/// A scalar cell value before stringification
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Free text
    Text(String),
    /// Numeric value, rendered with the codec's fixed format
    Number(f64),
    /// Boolean, rendered as `TRUE` / `FALSE`
    Bool(bool),
    /// Empty cell
    Empty,
}

impl CellValue {
    /// Renders the value the way it is stored in a [`Grid`](super::Grid)
    pub fn into_text(self) -> String {
        match self {
            CellValue::Text(s) => s,
            CellValue::Number(n) => format_number(n),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

// ============================================================================
// RowReader
// ============================================================================

/// Typed access to one decoded row
///
/// The row has already been padded to the header width, so every column
/// index below `header.len()` is readable.
#[derive(Debug)]
pub struct RowReader<'a> {
    header: &'static [&'static str],
    cells: &'a [String],
    row: usize,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(header: &'static [&'static str], cells: &'a [String], row: usize) -> Self {
        Self { header, cells, row }
    }

    /// Raw cell text for the column
    pub fn text(&self, col: usize) -> String {
        self.cells.get(col).cloned().unwrap_or_default()
    }

    /// Numeric cell value; an empty cell reads as zero
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCell` if the text is not a number
    pub fn number(&self, col: usize) -> Result<f64, DomainError> {
        let raw = self.cells.get(col).map(String::as_str).unwrap_or("");
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        trimmed.parse::<f64>().map_err(|_| DomainError::InvalidCell {
            row: self.row,
            column: self.header.get(col).copied().unwrap_or("?").to_string(),
            value: raw.to_string(),
        })
    }
}

// ============================================================================
// SheetRecord
// ============================================================================

/// A record type that maps onto sheet rows
pub trait SheetRecord: Sized + Clone + Send + Sync + 'static {
    /// Column headers, in column order
    const HEADER: &'static [&'static str];

    /// Cells for this record, in header order
    fn to_cells(&self) -> Vec<CellValue>;

    /// Rebuilds a record from a padded row
    ///
    /// # Errors
    /// Returns a `DomainError` if a cell cannot be converted
    fn from_row(row: &RowReader<'_>) -> Result<Self, DomainError>;
}

// ============================================================================
// ItemDefinition
// ============================================================================

/// An item that can appear in transactions (`"objects"` sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Item name, unique by convention
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Free-form grouping
    #[serde(default)]
    pub category: String,
    /// Unit of measure (e.g. "pcs", "kg")
    #[serde(default)]
    pub unit: String,
}

impl ItemDefinition {
    /// Creates an item with empty category and unit
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            category: String::new(),
            unit: String::new(),
        }
    }
}

impl SheetRecord for ItemDefinition {
    const HEADER: &'static [&'static str] = &["name", "price", "category", "unit"];

    fn to_cells(&self) -> Vec<CellValue> {
        vec![
            self.name.clone().into(),
            self.price.into(),
            self.category.clone().into(),
            self.unit.clone().into(),
        ]
    }

    fn from_row(row: &RowReader<'_>) -> Result<Self, DomainError> {
        Ok(Self {
            name: row.text(0),
            price: row.number(1)?,
            category: row.text(2),
            unit: row.text(3),
        })
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// A recorded movement of an item (`"stats"` sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// When the transaction happened, as entered by the user
    pub timestamp: String,
    /// Who recorded it
    pub user: String,
    /// Item name (refers to an [`ItemDefinition`])
    pub item: String,
    /// Quantity moved
    pub quantity: f64,
    /// Total amount
    pub amount: f64,
}

impl SheetRecord for Transaction {
    const HEADER: &'static [&'static str] = &["timestamp", "user", "item", "quantity", "amount"];

    fn to_cells(&self) -> Vec<CellValue> {
        vec![
            self.timestamp.clone().into(),
            self.user.clone().into(),
            self.item.clone().into(),
            self.quantity.into(),
            self.amount.into(),
        ]
    }

    fn from_row(row: &RowReader<'_>) -> Result<Self, DomainError> {
        Ok(Self {
            timestamp: row.text(0),
            user: row.text(1),
            item: row.text(2),
            quantity: row.number(3)?,
            amount: row.number(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_rendering() {
        assert_eq!(CellValue::from("A").into_text(), "A");
        assert_eq!(CellValue::from(100.0).into_text(), "100");
        assert_eq!(CellValue::from(2.5).into_text(), "2.5");
        assert_eq!(CellValue::from(true).into_text(), "TRUE");
        assert_eq!(CellValue::Empty.into_text(), "");
    }

    #[test]
    fn test_row_reader_number_empty_is_zero() {
        let cells = vec!["A".to_string(), String::new()];
        let row = RowReader::new(ItemDefinition::HEADER, &cells, 2);
        assert_eq!(row.number(1).unwrap(), 0.0);
        assert_eq!(row.number(3).unwrap(), 0.0);
    }

    #[test]
    fn test_row_reader_number_invalid_names_column() {
        let cells = vec!["A".to_string(), "ten".to_string()];
        let row = RowReader::new(ItemDefinition::HEADER, &cells, 5);
        let err = row.number(1).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidCell {
                row: 5,
                column: "price".to_string(),
                value: "ten".to_string(),
            }
        );
    }

    #[test]
    fn test_item_definition_cells_follow_header() {
        let item = ItemDefinition {
            name: "Bolt".to_string(),
            price: 0.25,
            category: "hardware".to_string(),
            unit: "pcs".to_string(),
        };
        let cells: Vec<String> = item.to_cells().into_iter().map(CellValue::into_text).collect();
        assert_eq!(cells, vec!["Bolt", "0.25", "hardware", "pcs"]);
        assert_eq!(cells.len(), ItemDefinition::HEADER.len());
    }

    #[test]
    fn test_transaction_from_row() {
        let cells: Vec<String> = ["2026-01-02 10:00", "ana", "Bolt", "4", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tx = Transaction::from_row(&RowReader::new(Transaction::HEADER, &cells, 2)).unwrap();
        assert_eq!(tx.user, "ana");
        assert_eq!(tx.quantity, 4.0);
        assert_eq!(tx.amount, 1.0);
    }

    #[test]
    fn test_item_definition_json_defaults() {
        let item: ItemDefinition = serde_json::from_str(r#"{"name":"A","price":100}"#).unwrap();
        assert_eq!(item, ItemDefinition::new("A", 100.0));
    }
}
