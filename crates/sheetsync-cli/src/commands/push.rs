//! Push command - Export local records to the shared sheets
//!
//! Provides the `sheetsync push` CLI command which:
//! 1. Loads records from a JSON file
//! 2. Queues every configured sheet and flushes immediately
//! 3. Waits for the export cycle (including backoff retries) or a timeout
//! 4. Shuts the engine down; anything still pending is dropped and reported

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{read_snapshot, wait_for_export, AppContext, Session};
use crate::output::{get_formatter, sheet_list};

#[derive(Debug, Args)]
pub struct PushCommand {
    /// JSON file with the records to export
    #[arg(long)]
    pub input: PathBuf,

    /// Seconds to wait for the export before giving up
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl PushCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.engine_config()?;
        let snapshot = read_snapshot(&self.input)?;

        info!(
            input = %self.input.display(),
            objects = snapshot.objects.len(),
            stats = snapshot.stats.len(),
            "Pushing records"
        );

        let mut session = Session::start(config, ctx.offline, Some(snapshot))?;
        let queued = session.enqueue_all().await?;
        session.coordinator.flush()?;

        let wait = wait_for_export(
            &mut session.events,
            queued,
            Duration::from_secs(self.timeout_secs),
        )
        .await;
        session.coordinator.shutdown().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": wait.failed.is_empty() && wait.pending.is_empty(),
                "written": wait.written,
                "failed": wait.failed.iter().map(|(sheet, error)| {
                    serde_json::json!({ "sheet": sheet, "error": error })
                }).collect::<Vec<_>>(),
                "pending": wait.pending,
            }));
        } else {
            if !wait.written.is_empty() {
                formatter.success(&format!("Exported {}", sheet_list(&wait.written)));
            }
            for (sheet, error) in &wait.failed {
                formatter.error(&format!("{sheet}: {error}"));
            }
            if !wait.pending.is_empty() {
                formatter.warn(&format!(
                    "Not exported before timeout: {}",
                    sheet_list(&wait.pending)
                ));
            }
        }

        if !wait.failed.is_empty() || !wait.pending.is_empty() {
            anyhow::bail!("Push incomplete");
        }
        Ok(())
    }
}
