//! SheetSync Remote - Remote store adapters
//!
//! Provides two implementations of the
//! [`IRemoteStore`](sheetsync_core::ports::IRemoteStore) port:
//! - An async HTTP client for a Sheets-v4-style REST API
//! - An in-memory store for tests and offline runs
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with status classification
//! - [`provider`] - `IRemoteStore` implementation over the HTTP client
//! - [`memory`] - Scriptable in-memory store
//! - [`retry_after`] - `Retry-After` header parsing

pub mod client;
pub mod memory;
pub mod provider;
pub mod retry_after;

pub use client::SheetsClient;
pub use memory::MemoryRemoteStore;
pub use provider::SheetsRemoteStore;
