//! In-memory record cabinet
//!
//! The cabinet holds the two governance collections (`objects` and `stats`)
//! and implements [`ILocalRecords`] so the sync engine can apply imported
//! sheets to it.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use super::errors::DomainError;
use super::grid::Grid;
use super::newtypes::SheetName;
use super::records::{ItemDefinition, SheetRecord, Transaction};
use crate::codec::SnapshotCodec;
use crate::ports::ILocalRecords;

// ============================================================================
// RecordTable
// ============================================================================

/// One collection of records bound to a sheet
#[derive(Debug)]
pub struct RecordTable<R> {
    sheet: SheetName,
    records: RwLock<Vec<R>>,
}

impl<R: SheetRecord> RecordTable<R> {
    /// Creates an empty table for `sheet`
    pub fn new(sheet: SheetName) -> Self {
        Self::with_records(sheet, Vec::new())
    }

    /// Creates a table with initial records
    pub fn with_records(sheet: SheetName, records: Vec<R>) -> Self {
        Self {
            sheet,
            records: RwLock::new(records),
        }
    }

    /// Sheet this table is stored in
    pub fn sheet(&self) -> &SheetName {
        &self.sheet
    }

    /// Copy of the current records
    pub async fn snapshot(&self) -> Vec<R> {
        self.records.read().await.clone()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if the table holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Appends a record
    pub async fn push(&self, record: R) {
        self.records.write().await.push(record);
    }

    /// Replaces every record
    pub async fn replace(&self, records: Vec<R>) {
        *self.records.write().await = records;
    }

    /// Encodes the current records
    pub async fn encode(&self, codec: &SnapshotCodec) -> Grid {
        codec.encode(&self.records.read().await)
    }

    /// Decodes `grid` and swaps it in as the whole collection
    ///
    /// # Errors
    /// Returns the decode error; the table is left untouched
    pub async fn apply(&self, codec: &SnapshotCodec, grid: &Grid) -> Result<usize, DomainError> {
        let decoded: Vec<R> = codec.decode(&self.sheet, grid)?;
        let count = decoded.len();
        *self.records.write().await = decoded;
        Ok(count)
    }
}

// ============================================================================
// CabinetSnapshot
// ============================================================================

/// Serializable copy of a cabinet's contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CabinetSnapshot {
    /// Item definitions
    #[serde(default)]
    pub objects: Vec<ItemDefinition>,
    /// Transactions
    #[serde(default)]
    pub stats: Vec<Transaction>,
}

// ============================================================================
// Cabinet
// ============================================================================

/// The governance cabinet: item definitions plus transactions
#[derive(Debug)]
pub struct Cabinet {
    codec: SnapshotCodec,
    objects: RecordTable<ItemDefinition>,
    stats: RecordTable<Transaction>,
}

impl Default for Cabinet {
    fn default() -> Self {
        Self::new(SnapshotCodec::default())
    }
}

impl Cabinet {
    /// Creates an empty cabinet
    pub fn new(codec: SnapshotCodec) -> Self {
        Self::from_snapshot(codec, CabinetSnapshot::default())
    }

    /// Creates a cabinet holding the snapshot's records
    pub fn from_snapshot(codec: SnapshotCodec, snapshot: CabinetSnapshot) -> Self {
        Self {
            codec,
            objects: RecordTable::with_records(SheetName::objects(), snapshot.objects),
            stats: RecordTable::with_records(SheetName::stats(), snapshot.stats),
        }
    }

    /// Codec used for encoding and applying
    pub fn codec(&self) -> &SnapshotCodec {
        &self.codec
    }

    /// Item definitions (`"objects"` sheet)
    pub fn objects(&self) -> &RecordTable<ItemDefinition> {
        &self.objects
    }

    /// Transactions (`"stats"` sheet)
    pub fn stats(&self) -> &RecordTable<Transaction> {
        &self.stats
    }

    /// Encodes the collection stored in `sheet`
    ///
    /// # Errors
    /// Returns `DomainError::UnknownSheet` if no collection backs the sheet
    pub async fn encode_sheet(&self, sheet: &SheetName) -> Result<Grid, DomainError> {
        match sheet.as_str() {
            SheetName::OBJECTS => Ok(self.objects.encode(&self.codec).await),
            SheetName::STATS => Ok(self.stats.encode(&self.codec).await),
            other => Err(DomainError::UnknownSheet(other.to_string())),
        }
    }

    /// Copies the current contents
    pub async fn snapshot(&self) -> CabinetSnapshot {
        CabinetSnapshot {
            objects: self.objects.snapshot().await,
            stats: self.stats.snapshot().await,
        }
    }
}

#[async_trait::async_trait]
impl ILocalRecords for Cabinet {
    async fn apply_remote(&self, sheet: &SheetName, grid: &Grid) -> Result<usize, DomainError> {
        let count = match sheet.as_str() {
            SheetName::OBJECTS => self.objects.apply(&self.codec, grid).await?,
            SheetName::STATS => self.stats.apply(&self.codec, grid).await?,
            other => return Err(DomainError::UnknownSheet(other.to_string())),
        };
        info!(sheet = %sheet, records = count, "Applied remote sheet");
        Ok(count)
    }
}
