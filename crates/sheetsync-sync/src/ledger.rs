//! Content-hash ledger used for echo suppression
//!
//! Two maps per coordinator: the hash of the last content this engine wrote
//! to each sheet, and the hash of the last content it applied from each
//! sheet. After a successful export both hold the exported hash.

use std::collections::HashMap;

use sheetsync_core::domain::{ContentHash, SheetName};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct HashLedger {
    exported: HashMap<SheetName, ContentHash>,
    imported: HashMap<SheetName, ContentHash>,
}

impl HashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful export; the remote now holds `hash`
    pub fn record_export(&mut self, sheet: SheetName, hash: ContentHash) {
        trace!(sheet = %sheet, hash = hash.short(), "Ledger: exported");
        self.imported.insert(sheet.clone(), hash.clone());
        self.exported.insert(sheet, hash);
    }

    /// Records content applied from the remote
    pub fn record_import(&mut self, sheet: SheetName, hash: ContentHash) {
        trace!(sheet = %sheet, hash = hash.short(), "Ledger: imported");
        self.imported.insert(sheet, hash);
    }

    /// Returns true if `hash` matches either ledger entry for the sheet
    pub fn is_known(&self, sheet: &SheetName, hash: &ContentHash) -> bool {
        self.exported.get(sheet) == Some(hash) || self.imported.get(sheet) == Some(hash)
    }

    pub fn last_exported(&self, sheet: &SheetName) -> Option<&ContentHash> {
        self.exported.get(sheet)
    }

    pub fn last_imported(&self, sheet: &SheetName) -> Option<&ContentHash> {
        self.imported.get(sheet)
    }
}
