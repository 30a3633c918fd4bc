//! Pull command - Import the shared sheets into a local JSON file
//!
//! Provides the `sheetsync pull` CLI command which:
//! 1. Starts an engine session with an empty cabinet
//! 2. Imports every configured sheet
//! 3. Writes the resulting records as JSON (file or stdout)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{write_snapshot, AppContext, Session};
use crate::output::{get_formatter, sheet_list};

#[derive(Debug, Args)]
pub struct PullCommand {
    /// Write the records to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl PullCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.engine_config()?;

        let session = Session::start(config, ctx.offline, None)?;
        info!(sheets = ?session.sheets, "Pulling sheets");

        let result = session.coordinator.import_all(session.sheets.clone()).await;
        let snapshot = session.cabinet.snapshot().await;
        session.coordinator.shutdown().await;
        let report = result.context("Import failed")?;

        match &self.out {
            Some(path) => write_snapshot(path, &snapshot)?,
            None if !ctx.format.is_json() => {
                let json = serde_json::to_string_pretty(&snapshot)
                    .context("Failed to serialize records")?;
                println!("{json}");
            }
            None => {}
        }

        if ctx.format.is_json() {
            let records = match self.out {
                Some(_) => serde_json::Value::Null,
                None => serde_json::to_value(&snapshot).context("Failed to serialize records")?,
            };
            formatter.print_json(&serde_json::json!({
                "success": true,
                "applied": report.applied,
                "skipped": report.skipped,
                "missing": report.missing,
                "objects": snapshot.objects.len(),
                "stats": snapshot.stats.len(),
                "out": self.out.as_ref().map(|p| p.display().to_string()),
                "records": records,
            }));
        } else if self.out.is_some() {
            formatter.success(&format!(
                "Pulled {} item definitions and {} transactions",
                snapshot.objects.len(),
                snapshot.stats.len()
            ));
            formatter.info(&format!("Applied: {}", sheet_list(&report.applied)));
            if !report.missing.is_empty() {
                formatter.warn(&format!(
                    "Missing remotely: {}",
                    sheet_list(&report.missing)
                ));
            }
        }

        Ok(())
    }
}
