//! Capline CLI - Headless Caption Player
//!
//! Features:
//! - Caption file validation
//! - Caption lookup at a playback position
//! - Video URL classification
//! - Simulated playback with a live caption overlay

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Capline CLI - Caption overlay toolkit
#[derive(Parser)]
#[command(name = "capline")]
#[command(author = "Capline Developers")]
#[command(version)]
#[command(about = "Overlay typed captions on a playing video", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Player configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a caption file
    Parse {
        /// Caption file, `-` for stdin
        captions: PathBuf,
    },

    /// Show the caption active at a playback position
    Resolve {
        /// Caption file, `-` for stdin
        captions: PathBuf,

        /// Position as HH:MM:SS or seconds
        #[arg(short, long)]
        at: String,
    },

    /// Classify a video URL
    Inspect {
        /// Video URL
        url: String,
    },

    /// Play a URL on a simulated player and print captions as they change
    Play {
        /// Video URL
        url: String,

        /// Caption file, `-` for stdin
        #[arg(short = 'C', long)]
        captions: Option<PathBuf>,

        /// Seconds of playback to simulate
        #[arg(short, long, default_value = "30")]
        duration: u64,

        /// Playback speed
        #[arg(short, long, default_value = "1.0")]
        rate: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { captions } => {
            commands::parse(&captions, &config, &cli.format)?;
        }
        Commands::Resolve { captions, at } => {
            commands::resolve(&captions, &at, &config, &cli.format)?;
        }
        Commands::Inspect { url } => {
            commands::inspect(&url, &cli.format)?;
        }
        Commands::Play { url, captions, duration, rate } => {
            commands::play(&url, captions.as_deref(), duration, rate, config, &cli.format).await?;
        }
    }

    Ok(())
}
