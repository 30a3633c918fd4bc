//! SheetSync Core - Domain types, snapshot codec and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `SheetName`, `Grid`, `ContentHash`, `ItemDefinition`, `Transaction`
//! - **Snapshot codec** - records to grids and back, canonical content hashing
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `ILocalRecords`, `IPermissionGate`
//! - **Configuration** - YAML configuration with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module holds plain data and validation. Ports define trait
//! interfaces that the sync engine consumes and adapter crates implement.

pub mod codec;
pub mod config;
pub mod domain;
pub mod ports;
