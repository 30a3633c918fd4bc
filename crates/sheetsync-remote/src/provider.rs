//! SheetsRemoteStore - IRemoteStore implementation over the REST client
//!
//! Wraps the [`SheetsClient`] and composes its calls to fulfil the
//! [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - `batch_write` needs replace semantics, but the values API only
//!   overwrites the written extent. Values go out first in one request, then
//!   one `batchClear` removes every row below and every column right of each
//!   new grid.
//! - Sheets that do not exist yet are reported as partial failures. The
//!   engine's per-sheet fallback creates them.
//! - `ensure_sheet` lists the document's sheets before adding one, which
//!   keeps it idempotent.

use std::collections::HashSet;

use anyhow::Result;
use sheetsync_core::config::RemoteConfig;
use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::{BatchWriteReport, IRemoteStore, RemoteError, SyncPayload};
use tracing::{debug, info, warn};

use crate::client::{trailing_columns_range, trailing_range, SheetsClient};

/// Remote store backed by a spreadsheet REST API
#[derive(Debug, Clone)]
pub struct SheetsRemoteStore {
    client: SheetsClient,
}

impl SheetsRemoteStore {
    /// Creates a new store from an existing client
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }

    /// Creates a store from the `remote` configuration section
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let client = SheetsClient::new(
            &config.base_url,
            config.spreadsheet_id.clone(),
            config.access_token.clone(),
            config.timeout(),
        )?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &SheetsClient {
        &self.client
    }

    async fn existing_sheets(&self) -> Result<HashSet<String>, RemoteError> {
        Ok(self.client.sheet_titles().await?.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl IRemoteStore for SheetsRemoteStore {
    async fn fetch_sheet(&self, sheet: &SheetName) -> Result<Option<Grid>, RemoteError> {
        self.client.get_values(sheet).await
    }

    async fn batch_write(&self, payload: &SyncPayload) -> Result<BatchWriteReport, RemoteError> {
        let existing = self.existing_sheets().await?;

        let mut report = BatchWriteReport::success();
        let mut present: Vec<(&SheetName, &Grid)> = Vec::with_capacity(payload.len());
        for (sheet, grid) in payload.iter() {
            if existing.contains(sheet.as_str()) {
                present.push((sheet, grid));
            } else {
                debug!(sheet = %sheet, "Sheet missing remotely, left to fallback");
                report.failed.push((
                    sheet.clone(),
                    RemoteError::Fatal(format!("sheet '{sheet}' does not exist")),
                ));
            }
        }
        if present.is_empty() {
            return Ok(report);
        }

        self.client.batch_update_values(&present).await?;

        let ranges = present
            .iter()
            .flat_map(|(sheet, grid)| {
                std::iter::once(trailing_range(sheet, grid.row_count()))
                    .chain(trailing_columns_range(sheet, grid.col_count()))
            })
            .collect();
        if let Err(error) = self.client.batch_clear(ranges).await {
            warn!(error = %error, "Trailing clear failed after batch write");
            report.failed.extend(
                present
                    .iter()
                    .map(|(sheet, _)| ((*sheet).clone(), error.clone())),
            );
            return Ok(report);
        }

        info!(
            written = present.len(),
            failed = report.failed.len(),
            "Batch write completed"
        );
        Ok(report)
    }

    async fn write_sheet(&self, sheet: &SheetName, grid: &Grid) -> Result<(), RemoteError> {
        self.client.update_values(sheet, grid).await
    }

    async fn clear_sheet(&self, sheet: &SheetName) -> Result<(), RemoteError> {
        self.client.clear_values(sheet).await
    }

    async fn ensure_sheet(
        &self,
        sheet: &SheetName,
        min_rows: usize,
        min_cols: usize,
    ) -> Result<(), RemoteError> {
        if self.existing_sheets().await?.contains(sheet.as_str()) {
            return Ok(());
        }
        info!(sheet = %sheet, rows = min_rows, cols = min_cols, "Creating sheet");
        self.client.add_sheet(sheet, min_rows, min_cols).await
    }
}
