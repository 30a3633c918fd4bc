//! "Applying remote data" gate
//!
//! While the coordinator applies an imported sheet, the same setters the UI
//! uses may fire `enqueue`. The gate tells `enqueue` to drop those calls so an
//! import never re-exports what it just applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Two-state gate owned by the coordinator, closed (`false`) at construction
#[derive(Debug, Clone, Default)]
pub struct ApplyGate {
    applying: Arc<AtomicBool>,
}

impl ApplyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while an apply is in progress
    pub fn is_applying(&self) -> bool {
        self.applying.load(Ordering::Acquire)
    }

    /// Opens the gate until the returned guard is dropped
    pub fn enter(&self) -> ApplyGuard {
        self.applying.store(true, Ordering::Release);
        ApplyGuard {
            applying: Arc::clone(&self.applying),
        }
    }
}

/// Closes the gate on drop, including on early return or panic
#[derive(Debug)]
#[must_use = "the gate closes as soon as the guard is dropped"]
pub struct ApplyGuard {
    applying: Arc<AtomicBool>,
}

impl Drop for ApplyGuard {
    fn drop(&mut self) {
        self.applying.store(false, Ordering::Release);
    }
}
