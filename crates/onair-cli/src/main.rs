//! OnAir CLI - Headless Live Stream Player
//!
//! Features:
//! - Runs the playback controller against simulated capabilities
//! - Prints every UI state transition
//! - Fault injection for engine recovery paths
//! - Effective configuration dump

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{FailKind, WatchOptions};

/// OnAir CLI - Live stream playback toolkit
#[derive(Parser)]
#[command(name = "onair")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Headless live stream player and controller harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the player and watch its UI state
    Watch {
        /// Manifest URL (overrides the config file)
        url: Option<String>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Idle time before the controls hide
        #[arg(long)]
        idle_timeout_ms: Option<u64>,

        /// Skip the brand splash
        #[arg(long)]
        no_splash: bool,

        /// Simulate a sink that plays HLS natively
        #[arg(long)]
        native: bool,

        /// Reject the first play as an autoplay-policy violation
        #[arg(long)]
        autoplay_blocked: bool,

        /// Inject a fatal engine error one second in
        #[arg(long)]
        fail: Option<FailKind>,

        /// How long to run before unmounting
        #[arg(short, long, default_value = "8000")]
        run_for_ms: u64,
    },

    /// Print the effective default configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    if cli.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    }
    onair_core::init();

    match cli.command {
        Commands::Watch {
            url,
            config,
            idle_timeout_ms,
            no_splash,
            native,
            autoplay_blocked,
            fail,
            run_for_ms,
        } => {
            let options = WatchOptions {
                url,
                config,
                idle_timeout_ms,
                splash: !no_splash,
                native,
                autoplay_blocked,
                fail,
                run_for_ms,
            };
            commands::watch(options, &cli.format).await?;
        }
        Commands::Config => {
            commands::show_config(&cli.format)?;
        }
    }

    Ok(())
}
