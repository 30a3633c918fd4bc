//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates or in the
//! surrounding application.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Shared spreadsheet service (fetch, batch write, create)
//! - [`ILocalRecords`] - In-memory record collections that imports are applied to
//! - [`IPermissionGate`] - Yes/no "can edit" check consulted before enqueueing

pub mod local_records;
pub mod permission;
pub mod remote_store;

pub use local_records::ILocalRecords;
pub use permission::{AllowAll, IPermissionGate, StaticPermission};
pub use remote_store::{BatchWriteReport, IRemoteStore, RemoteError, SyncPayload};
