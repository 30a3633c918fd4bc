//! Spreadsheet REST client
//!
//! Provides a typed HTTP client for a Sheets-v4-style values API. Handles the
//! bearer token, URL construction, JSON (de)serialization and the mapping of
//! HTTP failures onto [`RemoteError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sheetsync_core::domain::SheetName;
//! use sheetsync_remote::client::SheetsClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SheetsClient::new(
//!     "https://sheets.googleapis.com",
//!     "spreadsheet-id",
//!     Some("access-token".to_string()),
//!     Duration::from_secs(30),
//! )?;
//! let grid = client.get_values(&SheetName::objects()).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_core::codec;
use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::RemoteError;
use tracing::{debug, warn};

use crate::retry_after::parse_retry_after;

/// Error text returned with a 400 when the range names an unknown sheet
const UNKNOWN_RANGE_MESSAGE: &str = "Unable to parse range";

/// Rightmost column used when clearing trailing rows
const LAST_COLUMN: &str = "ZZZ";

// ============================================================================
// API payload types
// ============================================================================

/// A block of values addressed by an A1 range
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    /// Omitted by the service for an empty sheet
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateValuesRequest<'a> {
    value_input_option: &'a str,
    data: Vec<ValueRange>,
}

#[derive(Debug, Serialize)]
struct BatchClearValuesRequest {
    ranges: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

// ============================================================================
// A1 notation helpers
// ============================================================================

/// Converts a 1-based column number to its letter form (1 → A, 27 → AA)
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quotes a sheet name for use in an A1 range
///
/// Sheet names never contain quotes, so no escaping is needed.
fn quoted(sheet: &SheetName) -> String {
    format!("'{}'", sheet.as_str())
}

/// Range covering exactly the extent of `grid`, or `None` for an empty grid
pub fn grid_range(sheet: &SheetName, grid: &Grid) -> Option<String> {
    if grid.row_count() == 0 || grid.col_count() == 0 {
        return None;
    }
    Some(format!(
        "{}!A1:{}{}",
        quoted(sheet),
        column_letter(grid.col_count()),
        grid.row_count()
    ))
}

/// Range covering every row after the first `rows`
pub fn trailing_range(sheet: &SheetName, rows: usize) -> String {
    format!("{}!A{}:{}", quoted(sheet), rows + 1, LAST_COLUMN)
}

/// Range covering every column after the first `cols`, or `None` when
/// `cols` is zero (the trailing row range already covers the sheet)
pub fn trailing_columns_range(sheet: &SheetName, cols: usize) -> Option<String> {
    if cols == 0 {
        return None;
    }
    Some(format!(
        "{}!{}1:{}",
        quoted(sheet),
        column_letter(cols + 1),
        LAST_COLUMN
    ))
}

fn to_value_range(range: String, grid: &Grid) -> ValueRange {
    ValueRange {
        range: Some(range),
        major_dimension: Some("ROWS".to_string()),
        values: grid
            .rows()
            .iter()
            .map(|row| row.iter().cloned().map(Value::String).collect())
            .collect(),
    }
}

/// Stringifies a cell the way the codec formats values
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(codec::format_number)
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// Maps a transport-level failure
pub fn classify_transport(error: &reqwest::Error) -> RemoteError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        RemoteError::Transient(error.to_string())
    } else {
        RemoteError::Fatal(error.to_string())
    }
}

/// Maps a non-success HTTP status
pub fn classify_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> RemoteError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RemoteError::RateLimited {
            retry_after: retry_after.and_then(parse_retry_after),
        };
    }
    let message = format!("{status}: {}", body.trim());
    if status.is_server_error() {
        RemoteError::Transient(message)
    } else {
        RemoteError::Fatal(message)
    }
}

// ============================================================================
// SheetsClient
// ============================================================================

/// HTTP client for one spreadsheet document
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: Option<String>,
}

impl SheetsClient {
    /// Creates a client for the given document
    ///
    /// # Arguments
    /// * `base_url` - Service root (e.g. `https://sheets.googleapis.com`)
    /// * `spreadsheet_id` - Identifier of the spreadsheet document
    /// * `access_token` - Bearer token, if the service requires one
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid remote base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Remote base URL cannot carry a path: {base_url}");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            access_token,
        })
    }

    /// Returns the spreadsheet document identifier
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Returns the service root URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/v4/spreadsheets/{id}/{tail...}` with each tail segment
    /// percent-encoded
    fn url(&self, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets"])
                .extend(tail);
        }
        url
    }

    /// Document URL with a suffix on the id segment (`{id}:batchUpdate`)
    fn document_url(&self, suffix: &str) -> Url {
        self.url(&[&format!("{}{suffix}", self.spreadsheet_id)])
    }

    /// Creates an authenticated request builder
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and maps failures onto [`RemoteError`]
    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::error_from(response).await)
    }

    async fn error_from(response: Response) -> RemoteError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, retry_after.as_deref(), &body);
        warn!(status = status.as_u16(), error = %error, "Remote request failed");
        error
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Reads all values of a sheet
    ///
    /// # Returns
    /// `None` if the sheet does not exist
    pub async fn get_values(&self, sheet: &SheetName) -> Result<Option<Grid>, RemoteError> {
        let url = self.url(&[&self.spreadsheet_id, "values", sheet.as_str()]);
        debug!(sheet = %sheet, "GET values");

        let response = self
            .request(Method::GET, url)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(sheet = %sheet, "Sheet not found (404)");
            return Ok(None);
        }
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains(UNKNOWN_RANGE_MESSAGE) {
                debug!(sheet = %sheet, "Sheet not found (unknown range)");
                return Ok(None);
            }
            return Err(classify_status(status, None, &body));
        }
        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Invalid values response: {e}")))?;

        let grid = Grid::new(
            range
                .values
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        );
        Ok(Some(grid.trimmed()))
    }

    /// Writes several grids in one request, each starting at `A1`
    pub async fn batch_update_values(&self, grids: &[(&SheetName, &Grid)]) -> Result<(), RemoteError> {
        let data: Vec<ValueRange> = grids
            .iter()
            .filter_map(|(sheet, grid)| {
                grid_range(sheet, grid).map(|range| to_value_range(range, grid))
            })
            .collect();
        if data.is_empty() {
            return Ok(());
        }

        debug!(ranges = data.len(), "POST values:batchUpdate");
        let body = BatchUpdateValuesRequest {
            value_input_option: "RAW",
            data,
        };
        self.send(
            self.request(Method::POST, self.url(&[&self.spreadsheet_id, "values:batchUpdate"]))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    /// Clears several A1 ranges in one request
    pub async fn batch_clear(&self, ranges: Vec<String>) -> Result<(), RemoteError> {
        if ranges.is_empty() {
            return Ok(());
        }
        debug!(ranges = ?ranges, "POST values:batchClear");
        self.send(
            self.request(Method::POST, self.url(&[&self.spreadsheet_id, "values:batchClear"]))
                .json(&BatchClearValuesRequest { ranges }),
        )
        .await?;
        Ok(())
    }

    /// Writes one grid at `A1` without touching cells beyond its extent
    pub async fn update_values(&self, sheet: &SheetName, grid: &Grid) -> Result<(), RemoteError> {
        let Some(range) = grid_range(sheet, grid) else {
            return Ok(());
        };
        debug!(sheet = %sheet, range = %range, "PUT values");

        let url = self.url(&[&self.spreadsheet_id, "values", &range]);
        self.send(
            self.request(Method::PUT, url)
                .query(&[("valueInputOption", "RAW")])
                .json(&to_value_range(range.clone(), grid)),
        )
        .await?;
        Ok(())
    }

    /// Removes all values from a sheet
    pub async fn clear_values(&self, sheet: &SheetName) -> Result<(), RemoteError> {
        debug!(sheet = %sheet, "POST values:clear");
        let segment = format!("{}:clear", sheet.as_str());
        self.send(
            self.request(Method::POST, self.url(&[&self.spreadsheet_id, "values", &segment]))
                .json(&serde_json::json!({})),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // Sheets
    // ========================================================================

    /// Titles of every sheet in the document
    pub async fn sheet_titles(&self) -> Result<Vec<String>, RemoteError> {
        debug!("GET spreadsheet sheet list");
        let response = self
            .send(
                self.request(Method::GET, self.document_url(""))
                    .query(&[("fields", "sheets.properties")]),
            )
            .await?;
        let document: SpreadsheetResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Invalid spreadsheet response: {e}")))?;
        Ok(document
            .sheets
            .into_iter()
            .map(|entry| entry.properties.title)
            .collect())
    }

    /// Adds a sheet with the given grid size
    pub async fn add_sheet(&self, sheet: &SheetName, rows: usize, cols: usize) -> Result<(), RemoteError> {
        debug!(sheet = %sheet, rows, cols, "POST addSheet");
        let body = serde_json::json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": sheet.as_str(),
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]
        });
        self.send(
            self.request(Method::POST, self.document_url(":batchUpdate"))
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(
            "http://localhost:8080",
            "doc-1",
            Some("test-token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(4), "D");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_grid_range() {
        let grid = Grid::from_rows([vec!["name", "price"], vec!["A", "1"], vec!["B", "2"]]);
        assert_eq!(
            grid_range(&SheetName::objects(), &grid).as_deref(),
            Some("'objects'!A1:B3")
        );
        assert_eq!(grid_range(&SheetName::objects(), &Grid::empty()), None);
    }

    #[test]
    fn test_trailing_range_and_quoting() {
        let sheet = SheetName::new("price list").unwrap();
        assert_eq!(trailing_range(&sheet, 3), "'price list'!A4:ZZZ");
    }

    #[test]
    fn test_trailing_columns_range() {
        let sheet = SheetName::objects();
        assert_eq!(
            trailing_columns_range(&sheet, 2).as_deref(),
            Some("'objects'!C1:ZZZ")
        );
        assert_eq!(
            trailing_columns_range(&sheet, 26).as_deref(),
            Some("'objects'!AA1:ZZZ")
        );
        assert_eq!(trailing_columns_range(&sheet, 0), None);
    }

    #[test]
    fn test_cell_text_matches_codec_format() {
        assert_eq!(cell_text(serde_json::json!(100)), "100");
        assert_eq!(cell_text(serde_json::json!(0.1)), "0.1");
        assert_eq!(cell_text(serde_json::json!(true)), "TRUE");
        assert_eq!(cell_text(serde_json::json!(null)), "");
        assert_eq!(cell_text(serde_json::json!("x")), "x");
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some("12"), ""),
            RemoteError::RateLimited {
                retry_after: Some(Duration::from_secs(12))
            }
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None, ""),
            RemoteError::RateLimited { retry_after: None }
        );
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, None, "down"),
            RemoteError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None, "bad token"),
            RemoteError::Fatal(m) if m.contains("401")
        ));
    }

    #[test]
    fn test_request_builder() {
        let client = client();
        let url = client.url(&["doc-1", "values", "objects"]);
        let request = client.request(Method::GET, url).build().unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/v4/spreadsheets/doc-1/values/objects"
        );
        let auth = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth, "Bearer test-token");
    }

    #[test]
    fn test_document_url_suffix() {
        assert_eq!(
            client().document_url(":batchUpdate").path(),
            "/v4/spreadsheets/doc-1:batchUpdate"
        );
    }

    #[test]
    fn test_no_token_no_header() {
        let client =
            SheetsClient::new("http://localhost", "doc", None, Duration::from_secs(1)).unwrap();
        let request = client
            .request(Method::GET, client.document_url(""))
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(SheetsClient::new("not a url", "doc", None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"objects!A1:Z1000"}"#).unwrap();
        assert!(range.values.is_empty());
    }
}
