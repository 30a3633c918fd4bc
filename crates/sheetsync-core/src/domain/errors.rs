//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and decoding remote grids into records.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Sheet name is empty, too long, or contains range metacharacters
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Invalid content hash format (expected 64 lowercase hex characters)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// The header row of a remote sheet does not match the record layout
    #[error("Schema mismatch in sheet {sheet}: expected header {expected:?}, found {found:?}")]
    SchemaMismatch {
        /// Sheet being decoded
        sheet: String,
        /// Header the record type expects
        expected: Vec<String>,
        /// Header found in the grid
        found: Vec<String>,
    },

    /// A cell could not be converted into the field's type
    #[error("Invalid value {value:?} for column {column} in row {row}")]
    InvalidCell {
        /// 1-based row index in the grid (header included)
        row: usize,
        /// Column header
        column: String,
        /// Raw cell text
        value: String,
    },

    /// No local collection is registered for the sheet
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
