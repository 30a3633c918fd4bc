//! Permission gate port
//!
//! Role resolution happens elsewhere; the engine only asks whether the
//! current user may edit at all.

use std::sync::atomic::{AtomicBool, Ordering};

/// Yes/no edit permission consumed by the export pipeline
pub trait IPermissionGate: Send + Sync {
    /// Returns true if local mutations may be exported
    fn can_edit(&self) -> bool;
}

/// Gate that always allows edits
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl IPermissionGate for AllowAll {
    fn can_edit(&self) -> bool {
        true
    }
}

/// Gate backed by a flag that can be flipped at runtime
///
/// Useful when the surrounding application resolves roles after login.
#[derive(Debug, Default)]
pub struct StaticPermission {
    can_edit: AtomicBool,
}

impl StaticPermission {
    /// Creates a gate with the given initial answer
    pub fn new(can_edit: bool) -> Self {
        Self {
            can_edit: AtomicBool::new(can_edit),
        }
    }

    /// Changes the answer
    pub fn set(&self, can_edit: bool) {
        self.can_edit.store(can_edit, Ordering::SeqCst);
    }
}

impl IPermissionGate for StaticPermission {
    fn can_edit(&self) -> bool {
        self.can_edit.load(Ordering::SeqCst)
    }
}
