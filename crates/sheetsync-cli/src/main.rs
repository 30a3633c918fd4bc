//! SheetSync CLI - Command-line interface for SheetSync
//!
//! Provides commands for:
//! - Importing the shared sheets into a local JSON cabinet
//! - Exporting a local cabinet to the shared sheets
//! - Running the sync engine as a long-lived process
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, pull::PullCommand, push::PushCommand, run::RunCommand};
use commands::AppContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "sheetsync",
    version,
    about = "Keep local record collections in sync with a shared spreadsheet"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-memory remote store instead of the network (dry runs)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import the configured sheets and write them as JSON
    Pull(PullCommand),
    /// Export records from a JSON file to the configured sheets
    Push(PushCommand),
    /// Run the sync engine until interrupted
    Run(RunCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Filter directive used when `RUST_LOG` is not set
///
/// `-v` raises the configured level to `debug`, `-vv` to `trace`.
fn default_directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);
    let ctx = AppContext::load(cli.config.clone(), cli.offline, format)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directive(&ctx.config.logging.level, cli.verbose))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Pull(cmd) => cmd.execute(&ctx).await,
        Commands::Push(cmd) => cmd.execute(&ctx).await,
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("warn", 0), "warn");
        assert_eq!(default_directive("warn", 1), "debug");
        assert_eq!(default_directive("info", 3), "trace");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sheetsync", "push", "--input", "cab.json", "--offline", "-vv", "--json",
        ])
        .unwrap();

        assert!(cli.offline);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Push(_)));
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["sheetsync", "--config", "/tmp/s.yaml", "config", "path"])
            .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.yaml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_push_requires_input() {
        assert!(Cli::try_parse_from(["sheetsync", "push"]).is_err());
    }
}
