//! Pipegrab - Multi-Mirror Video Retrieval
//!
//! Command-line entry point: resolves a video identifier against a pool of
//! Piped API mirrors and downloads it as a single playable mp4 file.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pipegrab::cli::{Args, Commands};
use pipegrab::config::Config;
use pipegrab::fetcher::ProgressSink;
use pipegrab::mirrors::MirrorRegistry;
use pipegrab::resolver::StreamResolver;
use pipegrab::retriever::Retriever;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Fetch {
            video_id,
            output_dir,
            no_progress,
        } => {
            let retriever = Retriever::new(config)?;

            // Ctrl-C aborts the in-flight retrieval at the next suspension point
            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Interrupt received, cancelling retrieval");
                        cancel.cancel();
                    }
                });
            }

            let bar = if no_progress {
                None
            } else {
                let bar = ProgressBar::new(0);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .unwrap()
                        .progress_chars("#>-"),
                );
                Some(bar)
            };

            let sink: Option<ProgressSink> = bar.as_ref().map(|bar| {
                let bar = bar.clone();
                let sink: ProgressSink = Arc::new(move |done, total| {
                    if bar.length() != Some(total) {
                        bar.set_length(total);
                    }
                    bar.set_position(done);
                });
                sink
            });

            let retrieval = retriever
                .retrieve_cancellable(&video_id, &output_dir, sink.as_ref(), cancel)
                .await?;

            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            println!("Saved: {}", retrieval.path.display());
            println!("  Title:    {}", retrieval.metadata.title);
            println!("  Uploader: {}", retrieval.metadata.uploader);
            println!(
                "  Duration: {}",
                format_duration(retrieval.metadata.duration_seconds)
            );
            println!("  Views:    {}", retrieval.metadata.views);
            println!("  Quality:  {}", retrieval.metadata.quality_label);
            if let Some(detail) = retrieval.degrade_detail {
                println!("  Note: merge failed, file is video-only ({})", detail);
            }
        }
        Commands::Resolve { video_id, json } => {
            let registry = MirrorRegistry::from_config(&config.mirrors);
            let resolver = StreamResolver::new(registry, config.resolver.clone())?;

            let resolved = resolver.resolve(&video_id, None).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
                return Ok(());
            }

            println!("Title:    {}", resolved.metadata.title);
            println!("Uploader: {}", resolved.metadata.uploader);
            println!(
                "Duration: {}",
                format_duration(resolved.metadata.duration_seconds)
            );
            println!("Views:    {}", resolved.metadata.views);
            println!(
                "Video:    {} ({}, {})",
                resolved.video.quality,
                resolved.video.mime_type,
                if resolved.video.video_only {
                    "video-only"
                } else {
                    "self-contained"
                }
            );
            match resolved.audio {
                Some(audio) => println!(
                    "Audio:    {} bps ({})",
                    audio.bitrate, audio.mime_type
                ),
                None => println!("Audio:    none needed"),
            }
        }
        Commands::Mirrors => {
            println!("Configured mirrors (failover order):");
            for (index, endpoint) in config.mirrors.endpoints.iter().enumerate() {
                println!("  {}. {}", index + 1, endpoint);
            }
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let pipegrab_dir = std::env::current_dir()?.join(".pipegrab");
    let log_dir = pipegrab_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "pipegrab.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Format duration in seconds to human readable string
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(95), "1m 35s");
        assert_eq!(format_duration(3720), "1h 2m");
    }
}
