//! Integration tests for batch writes, single-sheet writes and sheet creation

use serde_json::json;
use sheetsync_core::domain::{Grid, SheetName};
use sheetsync_core::ports::{IRemoteStore, RemoteError, SyncPayload};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, doc_path};

fn payload(entries: Vec<(SheetName, Grid)>) -> SyncPayload {
    entries.into_iter().collect()
}

// ============================================================================
// batch_write
// ============================================================================

#[tokio::test]
async fn test_batch_write_clears_trailing_rows_and_columns() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects", "stats"]).await;
    common::mount_post(&server, "values:batchUpdate", 200).await;
    common::mount_post(&server, "values:batchClear", 200).await;

    let report = store
        .batch_write(&payload(vec![
            (
                SheetName::objects(),
                Grid::from_rows([["name", "price"], ["A", "100"]]),
            ),
            (SheetName::stats(), Grid::from_rows([["timestamp"]])),
        ]))
        .await
        .expect("batch write failed");

    assert!(report.is_complete());

    let updates = common::bodies(&server, "values:batchUpdate").await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["valueInputOption"], "RAW");
    assert_eq!(
        updates[0]["data"],
        json!([
            {
                "range": "'objects'!A1:B2",
                "majorDimension": "ROWS",
                "values": [["name", "price"], ["A", "100"]]
            },
            {
                "range": "'stats'!A1:A1",
                "majorDimension": "ROWS",
                "values": [["timestamp"]]
            }
        ])
    );

    let clears = common::bodies(&server, "values:batchClear").await;
    assert_eq!(
        clears,
        vec![json!({
            "ranges": [
                "'objects'!A3:ZZZ",
                "'objects'!C1:ZZZ",
                "'stats'!A2:ZZZ",
                "'stats'!B1:ZZZ"
            ]
        })]
    );
}

#[tokio::test]
async fn test_batch_write_reports_missing_sheet_as_partial_failure() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects"]).await;
    common::mount_post(&server, "values:batchUpdate", 200).await;
    common::mount_post(&server, "values:batchClear", 200).await;

    let report = store
        .batch_write(&payload(vec![
            (SheetName::objects(), Grid::from_rows([["a"]])),
            (SheetName::stats(), Grid::from_rows([["b"]])),
        ]))
        .await
        .unwrap();

    assert!(report.has_failed(&SheetName::stats()));
    assert!(!report.has_failed(&SheetName::objects()));

    let updates = common::bodies(&server, "values:batchUpdate").await;
    assert_eq!(updates[0]["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_batch_write_rate_limited_fails_whole_call() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects"]).await;
    Mock::given(method("POST"))
        .and(path(doc_path("values:batchUpdate")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(doc_path("values:batchClear")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = store
        .batch_write(&payload(vec![(SheetName::objects(), Grid::from_rows([["a"]]))]))
        .await;

    assert!(matches!(result, Err(RemoteError::RateLimited { .. })));
}

#[tokio::test]
async fn test_failed_trailing_clear_marks_sheets_failed() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects"]).await;
    common::mount_post(&server, "values:batchUpdate", 200).await;
    common::mount_post(&server, "values:batchClear", 500).await;

    let report = store
        .batch_write(&payload(vec![(SheetName::objects(), Grid::from_rows([["a"]]))]))
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, SheetName::objects());
    assert!(report.failed[0].1.is_retryable());
}

// ============================================================================
// write_sheet / clear_sheet
// ============================================================================

#[tokio::test]
async fn test_write_sheet_puts_raw_values() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("PUT"))
        .and(path_regex(format!("^{}/values/.+$", doc_path(""))))
        .and(query_param("valueInputOption", "RAW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    store
        .write_sheet(
            &SheetName::stats(),
            &Grid::from_rows([["timestamp", "user"], ["2026-05-01", "ana"]]),
        )
        .await
        .expect("write failed");

    let requests = server.received_requests().await.unwrap_or_default();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["range"], "'stats'!A1:B2");
    assert_eq!(body["values"][1], json!(["2026-05-01", "ana"]));
}

#[tokio::test]
async fn test_write_empty_grid_is_noop() {
    let (server, store) = common::setup_sheets_mock().await;

    store
        .write_sheet(&SheetName::stats(), &Grid::empty())
        .await
        .unwrap();

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_clear_sheet() {
    let (server, store) = common::setup_sheets_mock().await;
    Mock::given(method("POST"))
        .and(path(doc_path("values/objects:clear")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    store.clear_sheet(&SheetName::objects()).await.unwrap();
}

// ============================================================================
// ensure_sheet
// ============================================================================

#[tokio::test]
async fn test_ensure_existing_sheet_does_not_create() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects", "stats"]).await;
    Mock::given(method("POST"))
        .and(path(doc_path(":batchUpdate")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    store.ensure_sheet(&SheetName::stats(), 2, 5).await.unwrap();
}

#[tokio::test]
async fn test_ensure_missing_sheet_adds_it() {
    let (server, store) = common::setup_sheets_mock().await;
    common::mount_sheet_list(&server, &["objects"]).await;
    common::mount_post(&server, ":batchUpdate", 200).await;

    store.ensure_sheet(&SheetName::stats(), 2, 5).await.unwrap();

    let requests = common::bodies(&server, ":batchUpdate").await;
    assert_eq!(
        requests,
        vec![json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": "stats",
                        "gridProperties": { "rowCount": 2, "columnCount": 5 }
                    }
                }
            }]
        })]
    );
}
