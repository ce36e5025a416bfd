//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::{anyhow, bail, Context};
use capline_core::{
    format_timestamp, resolve_caption_within, CaptionList, CaptionParser, HeadlessFactory,
    HeadlessTiming, PlaybackSource, PlayerConfig, PlayerSession,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load the player configuration, defaults when no file is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    let Some(path) = path else {
        return Ok(PlayerConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = PlayerConfig::from_json(&json)
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(?config, "Loaded player config");
    Ok(config)
}

/// Read a file, or stdin for `-`
fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("reading stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_captions(path: &Path, config: &PlayerConfig) -> anyhow::Result<CaptionList> {
    let text = read_input(path)?;
    CaptionParser::new()
        .blank_lines(config.blank_lines)
        .parse(&text)
        .with_context(|| format!("parsing captions from {}", path.display()))
}

/// Parse a position given as `HH:MM:SS` or plain seconds
pub fn parse_position(value: &str) -> anyhow::Result<f64> {
    if value.contains(':') {
        return CaptionParser::parse_timestamp(value)
            .map_err(|issue| anyhow!("invalid position '{}': {}", value, issue));
    }
    let seconds: f64 = value
        .parse()
        .with_context(|| format!("invalid position '{}'", value))?;
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("position must be a non-negative number of seconds, got {}", value);
    }
    Ok(seconds)
}

/// Parse and validate a caption file
pub fn parse(path: &Path, config: &PlayerConfig, format: &str) -> anyhow::Result<()> {
    let captions = load_captions(path, config)?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_json(&captions)?),
        OutputFormat::Table => println!("{}", output::caption_table(&captions)),
        OutputFormat::Text => {
            println!("{} {} captions", style("OK").green().bold(), captions.len());
            for caption in &captions {
                println!("  {}  {}", style(format_timestamp(caption.time)).cyan(), caption.text);
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Resolved<'a> {
    time: f64,
    timestamp: String,
    caption: &'a str,
}

/// Show the caption active at a position
pub fn resolve(path: &Path, at: &str, config: &PlayerConfig, format: &str) -> anyhow::Result<()> {
    let captions = load_captions(path, config)?;
    let time = parse_position(at)?;
    let caption = resolve_caption_within(time, &captions, config.tolerance_secs);
    let timestamp = format_timestamp(time);

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let resolved = Resolved {
                time,
                timestamp,
                caption,
            };
            println!("{}", output::format_json(&resolved)?);
        }
        OutputFormat::Table | OutputFormat::Text => {
            if caption.is_empty() {
                println!("{}  {}", style(timestamp).cyan(), style("(no caption)").dim());
            } else {
                println!("{}  {}", style(timestamp).cyan(), caption);
            }
        }
    }

    Ok(())
}

/// Classify a video URL
pub fn inspect(url: &str, format: &str) -> anyhow::Result<()> {
    let source = PlaybackSource::classify(url.trim()).ok_or(capline_core::Error::EmptyUrl)?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_json(&source)?),
        OutputFormat::Table => println!("{}", output::source_table(&source)),
        OutputFormat::Text => {
            for (field, value) in output::source_fields(&source) {
                println!("  {:<10} {}", style(field).bold(), value);
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct CaptionChange<'a> {
    position: f64,
    timestamp: String,
    text: &'a str,
}

/// Play a URL on a headless backend and print caption changes
pub async fn play(
    url: &str,
    captions: Option<&Path>,
    duration: u64,
    rate: f64,
    config: PlayerConfig,
    format: &str,
) -> anyhow::Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        bail!("rate must be a positive number, got {}", rate);
    }
    let json = OutputFormat::from(format) == OutputFormat::Json;

    let timing = HeadlessTiming {
        rate,
        ..Default::default()
    };
    let session = PlayerSession::new(config, Arc::new(HeadlessFactory::new(timing)));

    if let Some(path) = captions {
        let text = read_input(path)?;
        let count = session
            .add_captions(&text)
            .await
            .with_context(|| format!("parsing captions from {}", path.display()))?;
        debug!(count, "Captions loaded");
    }

    let mut overlay = session.subscribe();
    session.load_video(url).await?;
    let source = session.source().await.context("no video loaded")?;

    let bar = if json {
        ProgressBar::hidden()
    } else {
        println!("Playing {} ({})", style(source.url()).bold(), source.kind());
        let bar = ProgressBar::new(duration);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:30} {pos}/{len}s {msg}")?
                .progress_chars("=>-"),
        );
        bar
    };

    let started = tokio::time::Instant::now();
    let deadline = tokio::time::sleep(Duration::from_secs(duration));
    tokio::pin!(deadline);
    let mut progress = tokio::time::interval(Duration::from_millis(250));

    let mut shown = String::new();
    let mut changes = 0usize;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = overlay.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = overlay.borrow_and_update().clone();
                if current.text == shown {
                    continue;
                }
                shown = current.text;
                changes += 1;

                let position = session.position().await.unwrap_or(0.0);
                if json {
                    let change = CaptionChange {
                        position,
                        timestamp: format_timestamp(position),
                        text: &shown,
                    };
                    println!("{}", serde_json::to_string(&change)?);
                } else if !shown.is_empty() {
                    bar.println(format!("{}  {}", style(format_timestamp(position)).cyan(), shown));
                }
            }
            _ = progress.tick() => {
                let position = session.position().await;
                let state = session.overlay().state;
                bar.set_position(started.elapsed().as_secs().min(duration));
                bar.set_message(match position {
                    Some(position) => format!("{} {}", state, format_timestamp(position)),
                    None => state.to_string(),
                });
            }
        }
    }

    let final_state = session.overlay().state;
    session.shutdown().await;
    bar.finish_and_clear();

    if !json {
        println!(
            "{} {} caption changes, player {}",
            style("Done:").green().bold(),
            changes,
            final_state
        );
    }

    Ok(())
}
