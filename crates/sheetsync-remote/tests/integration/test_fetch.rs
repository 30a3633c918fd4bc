//! Integration tests for reading sheets and HTTP status classification

use std::time::Duration;

use serde_json::json;
use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::{IRemoteStore, RemoteError};
use sheetsync_remote::{SheetsClient, SheetsRemoteStore};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, doc_path};

// ============================================================================
// Successful reads
// ============================================================================

#[tokio::test]
async fn test_fetch_returns_stringified_grid() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_values(
        &server,
        "objects",
        json!([
            ["name", "price", "category", "unit"],
            ["Apple", 100, "fruit", ""],
            ["Pear", 0.5, true, ""],
            ["", "", "", ""]
        ]),
    )
    .await;

    let grid = store
        .fetch_sheet(&SheetName::objects())
        .await
        .expect("fetch failed")
        .expect("sheet should exist");

    assert_eq!(
        grid,
        Grid::from_rows([
            vec!["name", "price", "category", "unit"],
            vec!["Apple", "100", "fruit"],
            vec!["Pear", "0.5", "TRUE"],
        ])
    );
}

#[tokio::test]
async fn test_fetch_sends_bearer_token_and_render_option() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/stats")))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
        .and(query_param("majorDimension", "ROWS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "range": "stats!A1:Z1000" })))
        .expect(1)
        .mount(&server)
        .await;

    let grid = store.fetch_sheet(&SheetName::stats()).await.unwrap();

    assert_eq!(grid, Some(Grid::empty()));
}

// ============================================================================
// Missing sheets
// ============================================================================

#[tokio::test]
async fn test_fetch_404_is_missing_sheet() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(store.fetch_sheet(&SheetName::objects()).await, Ok(None));
}

#[tokio::test]
async fn test_fetch_unknown_range_is_missing_sheet() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Unable to parse range: objects", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    assert_eq!(store.fetch_sheet(&SheetName::objects()).await, Ok(None));
}

#[tokio::test]
async fn test_fetch_other_bad_request_is_fatal() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid value"))
        .mount(&server)
        .await;

    let result = store.fetch_sheet(&SheetName::objects()).await;

    assert!(matches!(result, Err(RemoteError::Fatal(m)) if m.contains("Invalid value")));
}

// ============================================================================
// Status classification
// ============================================================================

#[tokio::test]
async fn test_429_is_rate_limited_with_retry_after() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    assert_eq!(
        store.fetch_sheet(&SheetName::objects()).await,
        Err(RemoteError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        })
    );
}

#[tokio::test]
async fn test_429_without_header() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    assert_eq!(
        store.fetch_sheet(&SheetName::objects()).await,
        Err(RemoteError::RateLimited { retry_after: None })
    );
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let result = store.fetch_sheet(&SheetName::objects()).await;

    assert!(matches!(result, Err(RemoteError::Transient(m)) if m.contains("503")));
}

#[tokio::test]
async fn test_unauthorized_is_fatal() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let result = store.fetch_sheet(&SheetName::objects()).await;

    assert!(matches!(result, Err(RemoteError::Fatal(m)) if m.contains("401")));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let (server, _) = common::setup_sheets_mock().await;
    Mock::given(method("GET"))
        .and(path(doc_path("values/objects")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = SheetsClient::new(&server.uri(), common::DOC, None, Duration::from_millis(200))
        .expect("client should build");
    let store = SheetsRemoteStore::new(client);

    let result = store.fetch_sheet(&SheetName::objects()).await;

    assert!(matches!(result, Err(RemoteError::Transient(_))));
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let client = SheetsClient::new(
        "http://127.0.0.1:9",
        common::DOC,
        None,
        Duration::from_secs(2),
    )
    .expect("client should build");
    let store = SheetsRemoteStore::new(client);

    let result = store.fetch_sheet(&SheetName::objects()).await;

    assert!(matches!(result, Err(RemoteError::Transient(_))));
}
