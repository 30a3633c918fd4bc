//! Integration tests for sheetsync-remote
//!
//! Uses wiremock to simulate the spreadsheet REST API and verifies the
//! SheetsRemoteStore contract and HTTP status classification.

mod common;

mod test_fetch;
mod test_write;
