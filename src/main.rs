//! Emotion Tracker CLI
//!
//! Local, privacy-first emotion journaling.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use emotion_tracker::{
    config::Config,
    core::{recent_activity, EmotionStats, SamplingController, StopReason},
    detector::{ChannelFrameSource, ExpressionDetector, Frame, FrameFeed, NoopDetector, ReplayDetector},
    store::{write_export, ExportFormat},
    transparency::{create_shared_log_with_persistence, TransparencyLog},
    EmotionTracker, PRIVACY_DECLARATION, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emotion-tracker")]
#[command(version = VERSION)]
#[command(about = "Local, privacy-first emotion journaling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start capturing and logging emotions
    Start {
        /// Replay recorded detector samples from a JSON-lines file
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Sampling interval in milliseconds (overrides the config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Pause capture
    Pause,

    /// Resume capture
    Resume,

    /// Show statistics for the stored log
    Status,

    /// Show recent entries, newest first
    Recent {
        /// Window size in hours (defaults to the configured window)
        #[arg(long)]
        hours: Option<f64>,

        /// Maximum number of entries to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Erase the whole emotion log
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,

        /// Also reset the cumulative processing counters
        #[arg(long)]
        stats: bool,
    },

    /// Print statistics again whenever the log changes
    Watch,

    /// Export the emotion log
    Export {
        /// Output directory
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            replay,
            interval_ms,
        } => cmd_start(replay, interval_ms).await,
        Commands::Pause => cmd_set_paused(true),
        Commands::Resume => cmd_set_paused(false),
        Commands::Status => cmd_status(),
        Commands::Recent { hours, limit } => cmd_recent(hours, limit),
        Commands::Clear { yes, stats } => cmd_clear(yes, stats),
        Commands::Watch => cmd_watch().await,
        Commands::Export { output, format } => cmd_export(output, &format),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(),
    }
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| format!("loading {}", Config::config_path().display()))
}

/// Cancel `token` on Ctrl+C.
fn cancel_on_ctrlc(token: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || token.cancel()).context("setting Ctrl+C handler")
}

async fn cmd_start(replay: Option<PathBuf>, interval_ms: Option<u64>) -> Result<()> {
    println!("Emotion Tracker v{VERSION}");
    println!();

    let mut config = load_config()?;
    if let Some(ms) = interval_ms {
        config.sample_interval = Duration::from_millis(ms.max(1));
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    match replay {
        Some(path) => {
            let detector = ReplayDetector::from_path(&path)
                .with_context(|| format!("loading replay file {}", path.display()))?;
            println!("Detector: replay of {} samples from {:?}", detector.len(), path);
            run_pipeline(Arc::new(detector), config).await
        }
        None => {
            println!("Detector: none configured");
            run_pipeline(Arc::new(NoopDetector::new()), config).await
        }
    }
}

async fn run_pipeline<D: ExpressionDetector>(detector: Arc<D>, config: Config) -> Result<()> {
    let transparency = create_shared_log_with_persistence(config.transparency_path());
    let tracker = Arc::new(
        EmotionTracker::from_config(&config).with_transparency(transparency.clone()),
    );

    println!("  Sampling interval: {}ms", config.sample_interval.as_millis());
    println!(
        "  Confidence threshold: > {:.2}, debounce: {}ms",
        config.min_confidence,
        config.debounce.as_millis()
    );
    println!("  Entries in log: {}", tracker.entries().len());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let cancel = CancellationToken::new();
    cancel_on_ctrlc(cancel.clone())?;

    // Other processes may change the log while we run
    let watcher = tokio::spawn(
        tracker
            .store()
            .watcher()
            .run(config.sync_poll_interval, cancel.clone()),
    );
    let sync = tokio::spawn({
        let tracker = tracker.clone();
        let cancel = cancel.clone();
        async move { tracker.run_sync(cancel).await }
    });

    let (feed, source) = ChannelFrameSource::channel();
    let source = Arc::new(source);
    let capture = spawn_capture_thread(feed.clone(), config.sample_interval, cancel.clone());

    let mut paused = config.paused;
    feed.set_active(!paused);
    if paused {
        println!("Capture is currently paused.");
        println!("Run `emotion-tracker resume` to start capturing.");
        println!();
    }

    let mut controller = SamplingController::new();
    let mut config_check = tokio::time::interval(Duration::from_secs(1));
    let mut changes = tracker.subscribe_changes();
    let mut last_printed = tracker.latest_entry().map(|e| e.id);

    loop {
        if !paused && !controller.is_running() {
            if let Some(StopReason::DetectorNotReady) = controller.stop().await? {
                eprintln!("No expression detector is ready.");
                eprintln!("Use `emotion-tracker start --replay FILE` to replay recorded samples.");
                break;
            }
            controller.start(
                detector.clone(),
                source.clone(),
                tracker.clone(),
                config.sampling_settings(),
            )?;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = config_check.tick() => {
                // `emotion-tracker pause/resume` controls a running tracker through the config file
                if let Ok(cfg) = Config::load() {
                    if cfg.paused != paused {
                        paused = cfg.paused;
                        feed.set_active(!paused);
                        println!();
                        if paused {
                            println!("Pausing capture...");
                            controller.stop().await?;
                        } else {
                            println!("Resuming capture...");
                        }
                    }
                }
            }
            changed = changes.changed() => {
                if !changed {
                    break;
                }
                if let Some(entry) = tracker.latest_entry() {
                    if last_printed.as_deref() != Some(entry.id.as_str()) {
                        println!(
                            "[{}] {} ({:.0}%, {})",
                            entry.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S"),
                            entry.emotion,
                            entry.confidence * 100.0,
                            entry.time_of_day
                        );
                        last_printed = Some(entry.id);
                    }
                }
            }
        }
    }

    println!();
    println!("Stopping capture...");
    cancel.cancel();
    feed.set_active(false);
    controller.stop().await?;
    let _ = watcher.await;
    let _ = sync.await;
    if capture.join().is_err() {
        eprintln!("Warning: capture thread panicked");
    }

    if let Err(e) = transparency.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency.summary());
    Ok(())
}

/// Stand-in for camera acquisition: pushes a blank frame every interval.
fn spawn_capture_thread(
    feed: FrameFeed,
    interval: Duration,
    cancel: CancellationToken,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !cancel.is_cancelled() {
            if feed.is_active() {
                feed.push(Frame::blank(640, 480));
            }
            thread::sleep(interval);
        }
    })
}

fn cmd_set_paused(paused: bool) -> Result<()> {
    let mut config = load_config()?;
    config.paused = paused;
    config.save().context("saving config")?;

    if paused {
        println!("Capture paused. Use 'emotion-tracker resume' to continue.");
    } else {
        println!("Capture resumed.");
    }
    Ok(())
}

fn print_stats(stats: &EmotionStats) {
    println!("Total emotions: {}", stats.total_emotions);
    if stats.total_emotions == 0 {
        return;
    }
    println!("Most common: {}", stats.most_common_emotion);
    println!("Average confidence: {:.0}%", stats.average_confidence * 100.0);
    println!();

    println!("Distribution:");
    for share in stats.distribution() {
        println!(
            "  {:<10} {:>4}  {:>5.1}%",
            share.emotion.as_str(),
            share.count,
            share.percentage
        );
    }
    println!();

    println!("Time of day:");
    for (bucket, count) in &stats.time_patterns {
        println!("  {:<10} {:>4}", bucket.as_str(), count);
    }
}

fn cmd_status() -> Result<()> {
    let config = load_config()?;
    let tracker = EmotionTracker::from_config(&config);

    println!("Emotion Tracker Status");
    println!("======================");
    println!();
    println!("Paused: {}", config.paused);
    println!(
        "Last {}h: {} entries",
        config.recent_window_hours,
        tracker.recent_default().len()
    );
    if let Some(latest) = tracker.latest_entry() {
        println!(
            "Latest: {} at {}",
            latest.emotion,
            latest.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!();

    print_stats(&tracker.stats());
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        let stats = TransparencyLog::with_persistence(stats_path).stats();
        println!("Cumulative Processing:");
        println!("  Frames sampled: {}", stats.frames_sampled);
        println!("  Samples with a face: {}", stats.faces_detected);
        println!("  Detector failures: {}", stats.detector_failures);
        println!("  Entries logged: {}", stats.entries_logged);
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_recent(hours: Option<f64>, limit: usize) -> Result<()> {
    let config = load_config()?;
    let tracker = EmotionTracker::from_config(&config);
    let hours = hours.unwrap_or(config.recent_window_hours);

    let entries = tracker.entries();
    let recent = recent_activity(&entries, hours, limit, Utc::now());
    if recent.is_empty() {
        println!("No emotions logged in the last {hours}h.");
        return Ok(());
    }

    for entry in recent {
        println!(
            "{}  {:<10} {:>3.0}%  {}",
            entry.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
            entry.emotion.as_str(),
            entry.confidence * 100.0,
            entry.time_of_day
        );
    }
    Ok(())
}

fn cmd_clear(yes: bool, reset_stats: bool) -> Result<()> {
    let config = load_config()?;
    let tracker = EmotionTracker::from_config(&config);
    let count = tracker.entries().len();

    if !yes {
        println!("This will permanently delete {count} entries.");
        println!("Run 'emotion-tracker clear --yes' to confirm.");
        return Ok(());
    }

    tracker.clear_all().context("clearing emotion log")?;
    println!("Deleted {count} entries.");

    if reset_stats {
        let log = TransparencyLog::with_persistence(config.transparency_path());
        log.reset();
        log.save().context("saving processing counters")?;
        println!("Processing counters reset.");
    }
    Ok(())
}

async fn cmd_watch() -> Result<()> {
    let config = load_config()?;
    let tracker = Arc::new(EmotionTracker::from_config(&config));

    let cancel = CancellationToken::new();
    cancel_on_ctrlc(cancel.clone())?;

    let watcher = tokio::spawn(
        tracker
            .store()
            .watcher()
            .run(config.sync_poll_interval, cancel.clone()),
    );

    print_stats(&tracker.stats());
    let mut changes = tracker.subscribe_changes();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = changes.changed() => {
                if !changed {
                    break;
                }
                tracker.reload();
                println!();
                println!("--- {} ---", chrono::Local::now().format("%H:%M:%S"));
                print_stats(&tracker.stats());
            }
        }
    }

    cancel.cancel();
    let _ = watcher.await;
    Ok(())
}

fn cmd_export(output: Option<PathBuf>, format: &str) -> Result<()> {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(e) => bail!(e),
    };
    let config = load_config()?;
    let tracker = EmotionTracker::from_config(&config);
    let entries = tracker.entries();

    if entries.is_empty() {
        println!("No emotions logged yet.");
        println!("Run 'emotion-tracker start' to begin capturing.");
        return Ok(());
    }

    let dir = output.unwrap_or(config.export_path);
    let path = write_export(&entries, &dir, format, Utc::now()).context("writing export")?;
    println!("Exported {} entries to {path:?}", entries.len());
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
