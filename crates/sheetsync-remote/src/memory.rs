//! In-memory remote store
//!
//! Follows the [`IRemoteStore`] contract closely enough for engine tests and
//! offline runs:
//! - `batch_write` replaces the content of existing sheets and reports
//!   missing ones as failed
//! - `write_sheet` overlays cells from `A1` and keeps rows beyond the grid
//! - `fetch_sheet` trims trailing empty cells and rows
//!
//! Every call is recorded before any scripted failure is applied, so tests
//! can assert on attempts as well as on successful writes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::{BatchWriteReport, IRemoteStore, RemoteError, SyncPayload};
use tracing::debug;

/// Kinds of calls, used to script failures and count attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Fetch,
    BatchWrite,
    WriteSheet,
    ClearSheet,
    EnsureSheet,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch(SheetName),
    BatchWrite(Vec<SheetName>),
    WriteSheet(SheetName),
    ClearSheet(SheetName),
    EnsureSheet(SheetName),
}

impl RemoteCall {
    pub fn kind(&self) -> CallKind {
        match self {
            RemoteCall::Fetch(_) => CallKind::Fetch,
            RemoteCall::BatchWrite(_) => CallKind::BatchWrite,
            RemoteCall::WriteSheet(_) => CallKind::WriteSheet,
            RemoteCall::ClearSheet(_) => CallKind::ClearSheet,
            RemoteCall::EnsureSheet(_) => CallKind::EnsureSheet,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    sheets: HashMap<SheetName, Grid>,
    calls: Vec<RemoteCall>,
    /// Errors returned by the next calls of a kind, in order
    scripted: HashMap<CallKind, VecDeque<RemoteError>>,
    /// Sheets reported as failed by the next batch that carries them
    batch_failures: HashMap<SheetName, RemoteError>,
}

impl MemoryState {
    /// Records `call` and pops a scripted failure for its kind
    fn begin(&mut self, call: RemoteCall) -> Result<(), RemoteError> {
        let kind = call.kind();
        self.calls.push(call);
        match self.scripted.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => {
                debug!(kind = ?kind, error = %error, "Scripted failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

/// Scriptable in-memory [`IRemoteStore`]
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryRemoteStore {
    /// Creates an empty store with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet with the given content (builder form)
    pub fn with_sheet(self, sheet: SheetName, grid: Grid) -> Self {
        self.set_sheet(sheet, grid);
        self
    }

    /// Creates or replaces a sheet without recording a call
    pub fn set_sheet(&self, sheet: SheetName, grid: Grid) {
        self.lock().sheets.insert(sheet, grid);
    }

    /// Raw stored content of a sheet, untrimmed
    pub fn sheet(&self, sheet: &SheetName) -> Option<Grid> {
        self.lock().sheets.get(sheet).cloned()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of one kind made so far
    pub fn count(&self, kind: CallKind) -> usize {
        self.lock().calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Makes the next call of `kind` fail with `error`
    pub fn fail_next(&self, kind: CallKind, error: RemoteError) {
        self.fail_times(kind, 1, error);
    }

    /// Makes the next `times` calls of `kind` fail with `error`
    pub fn fail_times(&self, kind: CallKind, times: usize, error: RemoteError) {
        self.lock()
            .scripted
            .entry(kind)
            .or_default()
            .extend(std::iter::repeat(error).take(times));
    }

    /// Reports `sheet` as failed in the next batch write that carries it
    pub fn fail_sheet_in_batch(&self, sheet: SheetName, error: RemoteError) {
        self.lock().batch_failures.insert(sheet, error);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MemoryRemoteStore {
    async fn fetch_sheet(&self, sheet: &SheetName) -> Result<Option<Grid>, RemoteError> {
        let mut state = self.lock();
        state.begin(RemoteCall::Fetch(sheet.clone()))?;
        Ok(state.sheets.get(sheet).map(Grid::trimmed))
    }

    async fn batch_write(&self, payload: &SyncPayload) -> Result<BatchWriteReport, RemoteError> {
        let mut state = self.lock();
        state.begin(RemoteCall::BatchWrite(payload.sheet_names()))?;

        let mut report = BatchWriteReport::success();
        for (sheet, grid) in payload.iter() {
            if let Some(error) = state.batch_failures.remove(sheet) {
                report.failed.push((sheet.clone(), error));
            } else if let Some(existing) = state.sheets.get_mut(sheet) {
                *existing = grid.clone();
            } else {
                report.failed.push((
                    sheet.clone(),
                    RemoteError::Fatal(format!("sheet '{sheet}' does not exist")),
                ));
            }
        }
        Ok(report)
    }

    async fn write_sheet(&self, sheet: &SheetName, grid: &Grid) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.begin(RemoteCall::WriteSheet(sheet.clone()))?;

        let existing = state
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| RemoteError::Fatal(format!("sheet '{sheet}' does not exist")))?;

        let mut rows = std::mem::take(existing).into_rows();
        for (r, row) in grid.rows().iter().enumerate() {
            if rows.len() <= r {
                rows.push(Vec::new());
            }
            let target = &mut rows[r];
            for (c, cell) in row.iter().enumerate() {
                if target.len() <= c {
                    target.resize(c + 1, String::new());
                }
                target[c] = cell.clone();
            }
        }
        *existing = Grid::new(rows);
        Ok(())
    }

    async fn clear_sheet(&self, sheet: &SheetName) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.begin(RemoteCall::ClearSheet(sheet.clone()))?;

        let existing = state
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| RemoteError::Fatal(format!("sheet '{sheet}' does not exist")))?;
        *existing = Grid::empty();
        Ok(())
    }

    async fn ensure_sheet(
        &self,
        sheet: &SheetName,
        _min_rows: usize,
        _min_cols: usize,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.begin(RemoteCall::EnsureSheet(sheet.clone()))?;
        state.sheets.entry(sheet.clone()).or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(rows.iter().map(|r| r.to_vec()))
    }

    #[tokio::test]
    async fn test_batch_write_replaces_content() {
        let store = MemoryRemoteStore::new()
            .with_sheet(SheetName::objects(), grid(&[&["a"], &["b"], &["c"]]));

        let payload: SyncPayload = [(SheetName::objects(), grid(&[&["x"]]))]
            .into_iter()
            .collect();
        let report = store.batch_write(&payload).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(store.sheet(&SheetName::objects()), Some(grid(&[&["x"]])));
    }

    #[tokio::test]
    async fn test_batch_write_reports_missing_sheet() {
        let store = MemoryRemoteStore::new();
        let payload: SyncPayload = [(SheetName::stats(), grid(&[&["x"]]))].into_iter().collect();

        let report = store.batch_write(&payload).await.unwrap();

        assert!(report.has_failed(&SheetName::stats()));
        assert_eq!(store.sheet(&SheetName::stats()), None);
    }

    #[tokio::test]
    async fn test_write_sheet_keeps_trailing_rows() {
        let store = MemoryRemoteStore::new()
            .with_sheet(SheetName::objects(), grid(&[&["a", "1"], &["b", "2"], &["c", "3"]]));

        store
            .write_sheet(&SheetName::objects(), &grid(&[&["x"]]))
            .await
            .unwrap();

        assert_eq!(
            store.sheet(&SheetName::objects()),
            Some(grid(&[&["x", "1"], &["b", "2"], &["c", "3"]]))
        );
    }

    #[tokio::test]
    async fn test_fetch_trims_and_reports_missing() {
        let store = MemoryRemoteStore::new()
            .with_sheet(SheetName::objects(), grid(&[&["a", ""], &["", ""]]));

        assert_eq!(
            store.fetch_sheet(&SheetName::objects()).await.unwrap(),
            Some(grid(&[&["a"]]))
        );
        assert_eq!(store.fetch_sheet(&SheetName::stats()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let store = MemoryRemoteStore::new().with_sheet(SheetName::objects(), Grid::empty());
        store.fail_times(CallKind::Fetch, 2, RemoteError::Transient("x".into()));

        assert!(store.fetch_sheet(&SheetName::objects()).await.is_err());
        assert!(store.fetch_sheet(&SheetName::objects()).await.is_err());
        assert!(store.fetch_sheet(&SheetName::objects()).await.is_ok());
        assert_eq!(store.count(CallKind::Fetch), 3);
    }

    #[tokio::test]
    async fn test_batch_failure_is_one_shot() {
        let store = MemoryRemoteStore::new().with_sheet(SheetName::objects(), Grid::empty());
        store.fail_sheet_in_batch(SheetName::objects(), RemoteError::Transient("x".into()));
        let payload: SyncPayload = [(SheetName::objects(), grid(&[&["x"]]))].into_iter().collect();

        assert!(store.batch_write(&payload).await.unwrap().has_failed(&SheetName::objects()));
        assert!(store.batch_write(&payload).await.unwrap().is_complete());
        assert_eq!(
            store.calls(),
            vec![
                RemoteCall::BatchWrite(vec![SheetName::objects()]),
                RemoteCall::BatchWrite(vec![SheetName::objects()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_and_clear() {
        let store = MemoryRemoteStore::new();

        store.ensure_sheet(&SheetName::stats(), 1, 1).await.unwrap();
        store
            .write_sheet(&SheetName::stats(), &grid(&[&["a"]]))
            .await
            .unwrap();
        store.ensure_sheet(&SheetName::stats(), 1, 1).await.unwrap();
        assert_eq!(store.sheet(&SheetName::stats()), Some(grid(&[&["a"]])));

        store.clear_sheet(&SheetName::stats()).await.unwrap();
        assert_eq!(store.sheet(&SheetName::stats()), Some(Grid::empty()));
        assert!(store.clear_sheet(&SheetName::objects()).await.is_err());
    }
}
