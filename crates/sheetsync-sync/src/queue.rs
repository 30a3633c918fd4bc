//! Pending payloads (the dirty queue)
//!
//! Maps each dirty sheet to its latest encoded grid. Only the newest payload
//! per sheet is kept. The coordinator takes the whole map atomically when a
//! flush begins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::SyncPayload;
use tracing::debug;

#[derive(Debug, Default)]
pub struct DirtyQueue {
    pending: Mutex<SyncPayload>,
}

impl DirtyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SyncPayload> {
        // The map stays consistent even if a holder panicked
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the payload for a sheet, replacing any unflushed one
    pub fn put(&self, sheet: SheetName, grid: Grid) {
        let replaced = self.lock().insert(sheet.clone(), grid).is_some();
        debug!(sheet = %sheet, replaced, "Payload queued");
    }

    /// Takes every pending payload, leaving the queue empty
    pub fn take(&self) -> SyncPayload {
        std::mem::take(&mut *self.lock())
    }

    /// Puts back payloads that could not be written
    ///
    /// A sheet that was enqueued again in the meantime keeps its newer payload.
    pub fn restore(&self, payload: SyncPayload) {
        let mut pending = self.lock();
        for (sheet, grid) in payload {
            if !pending.contains(&sheet) {
                pending.insert(sheet, grid);
            }
        }
    }

    /// Drops every pending payload
    pub fn clear(&self) -> usize {
        let dropped = self.take().len();
        if dropped > 0 {
            debug!(dropped, "Pending payloads dropped");
        }
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Sheets with pending payloads
    pub fn sheets(&self) -> Vec<SheetName> {
        self.lock().sheet_names()
    }
}
