//! Domain entities and business logic
//!
//! This module contains the core domain types for SheetSync:
//! - Newtypes for sheet names and content hashes
//! - The raw [`Grid`] representation of a sheet
//! - Record types and the [`SheetRecord`] row mapping
//! - The in-memory [`Cabinet`] the engine applies imports to
//! - Domain-specific error types

pub mod cabinet;
pub mod errors;
pub mod grid;
pub mod newtypes;
pub mod records;

// Re-export commonly used types
pub use cabinet::{Cabinet, CabinetSnapshot, RecordTable};
pub use errors::DomainError;
pub use grid::Grid;
pub use newtypes::*;
pub use records::{CellValue, ItemDefinition, RowReader, SheetRecord, Transaction};
