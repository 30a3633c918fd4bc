//! Shared test helpers for spreadsheet API integration tests
//!
//! Each helper mounts the mock endpoints a test needs on a wiremock server.
//! `setup_sheets_mock` returns a store pointing at that server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sheetsync_remote::{SheetsClient, SheetsRemoteStore};

/// Spreadsheet document id used by every test
pub const DOC: &str = "doc-test-001";

/// Starts a mock server and returns a `(MockServer, SheetsRemoteStore)` tuple
pub async fn setup_sheets_mock() -> (MockServer, SheetsRemoteStore) {
    let server = MockServer::start().await;
    let client = SheetsClient::new(
        &server.uri(),
        DOC,
        Some("test-access-token".to_string()),
        Duration::from_secs(5),
    )
    .expect("client should build");
    (server, SheetsRemoteStore::new(client))
}

/// Path of a document-level endpoint, e.g. `doc_path("values:batchUpdate")`
pub fn doc_path(tail: &str) -> String {
    if tail.is_empty() {
        format!("/v4/spreadsheets/{DOC}")
    } else if tail.starts_with(':') {
        format!("/v4/spreadsheets/{DOC}{tail}")
    } else {
        format!("/v4/spreadsheets/{DOC}/{tail}")
    }
}

/// Mounts the sheet list endpoint returning the given titles
pub async fn mount_sheet_list(server: &MockServer, titles: &[&str]) {
    let sheets: Vec<_> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| json!({ "properties": { "sheetId": i, "title": title } }))
        .collect();

    Mock::given(method("GET"))
        .and(path(doc_path("")))
        .and(query_param("fields", "sheets.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sheets": sheets })))
        .mount(server)
        .await;
}

/// Mounts a values read for one sheet
pub async fn mount_values(server: &MockServer, sheet: &str, values: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(doc_path(&format!("values/{sheet}"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": format!("{sheet}!A1:Z1000"),
            "majorDimension": "ROWS",
            "values": values
        })))
        .mount(server)
        .await;
}

/// Mounts a POST endpoint answering with `status` and an empty JSON body
pub async fn mount_post(server: &MockServer, tail: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(doc_path(tail)))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// JSON bodies of every request received on `tail`
pub async fn bodies(server: &MockServer, tail: &str) -> Vec<serde_json::Value> {
    let expected = doc_path(tail);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == expected)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(serde_json::Value::Null))
        .collect()
}
