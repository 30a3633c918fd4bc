//! SheetSync Sync - Debounced export and hash-checked import engine
//!
//! Provides:
//! - Coalescing of local edits into whole-sheet payloads
//! - Debounced batch export with rate-limit backoff
//! - On-demand import with echo suppression
//! - A single coordinator task arbitrating between the two
//!
//! ## Modules
//!
//! - [`coordinator`] - State machine owning timers, ledgers and workers
//! - [`export`] - Export worker (batch write plus per-sheet fallback)
//! - [`import`] - Import worker and report
//! - [`backoff`] - Rate-limit backoff policy
//! - [`ledger`] - Last exported / imported content hashes
//! - [`queue`] - Pending payloads with replace semantics
//! - [`gate`] - "Applying remote data" gate
//! - [`janitor`] - Long-interval aggregation pass

pub mod backoff;
pub mod coordinator;
pub mod export;
pub mod gate;
pub mod import;
pub mod janitor;
pub mod ledger;
pub mod queue;

use sheetsync_core::domain::{DomainError, SheetName};
use sheetsync_core::ports::RemoteError;
use thiserror::Error;

pub use backoff::{BackoffPolicy, BackoffState};
pub use coordinator::{
    CoordinatorSettings, CoordinatorState, EnqueueOutcome, SyncCoordinator, SyncEvent,
};
pub use gate::{ApplyGate, ApplyGuard};
pub use import::ImportReport;
pub use ledger::HashLedger;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The coordinator task has shut down
    #[error("Sync coordinator has stopped")]
    Stopped,

    /// The remote store rejected a request
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// An imported sheet could not be applied to local records
    #[error("Failed to apply sheet {sheet}: {source}")]
    Apply {
        /// Sheet whose grid was rejected
        sheet: SheetName,
        /// Decode or lookup failure
        #[source]
        source: DomainError,
    },
}
