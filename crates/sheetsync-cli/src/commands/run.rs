//! Run command - Long-running sync process
//!
//! Provides the `sheetsync run` CLI command which:
//! 1. Starts an engine session, optionally seeded from a JSON file
//! 2. Imports on startup (when configured) and on every poll interval
//! 3. Logs engine events until SIGINT or SIGTERM
//! 4. Shuts the coordinator down gracefully
//!
//! The janitor pass runs inside the coordinator and needs no wiring here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use sheetsync_sync::SyncEvent;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{read_snapshot, AppContext, Session};
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// JSON file with local records to start from (exported on startup)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.engine_config()?;
        let snapshot = self.input.as_deref().map(read_snapshot).transpose()?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        let mut session = Session::start(config, ctx.offline, snapshot)?;
        formatter.success("Sync engine running (Ctrl+C to stop)");

        if self.input.is_some() {
            let queued = session.enqueue_all().await?;
            info!(sheets = ?queued, "Queued local records from input");
        }

        if config.sync.import_on_startup {
            import_once(&session).await;
        }

        let mut poll = config.sync.poll_interval().map(poll_timer);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = next_tick(&mut poll) => import_once(&session).await,
                event = session.events.recv() => match event {
                    Some(event) => log_event(&event),
                    None => {
                        warn!("Coordinator stopped unexpectedly");
                        break;
                    }
                },
            }
        }

        let pending = session.coordinator.pending_sheets();
        if !pending.is_empty() {
            warn!(pending = ?pending, "Dropping unexported payloads on shutdown");
        }
        session.coordinator.shutdown().await;
        formatter.success("Sync engine stopped");
        Ok(())
    }
}

fn poll_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Waits for the next poll tick; never resolves when polling is disabled
async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn import_once(session: &Session) {
    match session.coordinator.import_all(session.sheets.clone()).await {
        Ok(report) if report.is_noop() => info!(
            skipped = ?report.skipped,
            missing = ?report.missing,
            "Import found nothing new"
        ),
        Ok(report) => info!(applied = ?report.applied, "Import applied remote changes"),
        Err(e) => error!(error = %e, "Import failed"),
    }
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::ExportFinished { sheets } => info!(sheets = ?sheets, "Export finished"),
        SyncEvent::ExportFailed { sheets, error } => {
            error!(sheets = ?sheets, error = %error, "Export failed")
        }
        SyncEvent::ImportApplied { sheets } => info!(sheets = ?sheets, "Remote changes applied"),
        SyncEvent::ImportFailed { error } => error!(error = %error, "Import failed"),
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_next_tick_follows_period() {
        let mut poll = Some(poll_timer(Duration::from_secs(60)));
        let start = Instant::now();

        next_tick(&mut poll).await;

        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_tick_without_polling_never_fires() {
        let mut poll = None;

        let fired = tokio::time::timeout(Duration::from_secs(3600), next_tick(&mut poll)).await;

        assert!(fired.is_err());
    }
}
