//! rapidshow - Display slides. Fast.
//!
//! This binary wires a source, the slide buffer and a headless display
//! loop together. The display loop ticks at the configured frame rate and
//! samples one frame per tick once the buffer is primed.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rapidshow::{
    config::{CatalogConfig, Cli, SourceCommand},
    BufferError, FilesystemSource, HttpCatalogClient, ImageScaler, ImageSource, MemoryProbe,
    ProcessMemoryProbe, RemoteCatalogSource, SlideBuffer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    log_configuration(&cli);

    match &cli.source {
        SourceCommand::Dir(dir) => match FilesystemSource::new(dir.patterns.as_slice()) {
            Ok(source) => {
                info!("  Found {} image(s)", source.len());
                run_slideshow(&cli, source).await
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
        SourceCommand::Gel(gel) => match open_catalog(gel) {
            Ok(source) => {
                info!("  Scratch dir: {}", source.scratch_dir().display());
                run_slideshow(&cli, source).await
            }
            Err(e) => {
                error!("Failed to set up catalog source: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "rapidshow=debug"
    } else {
        "rapidshow=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_configuration(cli: &Cli) {
    info!("rapidshow v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Display: {}x{} @ {} fps", cli.width, cli.height, cli.fps);
    match cli.max_slides {
        Some(max) => info!("  Buffer: at most {} slides", max),
        None => info!("  Buffer: up to {}% of system memory", cli.max_memory_percent),
    }
    info!("  Primed after: {} slides", cli.minimum_buffer_length);

    match &cli.source {
        SourceCommand::Dir(dir) => info!("  Source: {}", dir.patterns.join(", ")),
        SourceCommand::Gel(gel) => {
            info!("  Source: {} [{}]", gel.endpoint, gel.tags.join(" "));
            info!("  Resolution: {}", if gel.hq { "full" } else { "sample" });
        }
    }
}

fn open_catalog(
    gel: &CatalogConfig,
) -> Result<RemoteCatalogSource<HttpCatalogClient>, Box<dyn std::error::Error>> {
    let client = HttpCatalogClient::new(&gel.endpoint, gel.request_timeout())?;
    let source = RemoteCatalogSource::new(client, gel.query())?;
    Ok(source)
}

// =============================================================================
// Display Loop
// =============================================================================

async fn run_slideshow<S: ImageSource + 'static>(cli: &Cli, source: S) -> ExitCode {
    let probe = Arc::new(ProcessMemoryProbe::new());
    let buffer = Arc::new(SlideBuffer::new(cli.buffer_config(), probe.clone()));
    let display = cli.display();

    let producer = buffer.start(source, ImageScaler::new(display));

    let mut frame_ticker = tokio::time::interval(cli.frame_interval());
    frame_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_ticker = tokio::time::interval(Duration::from_secs(1));
    stats_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_progress: Option<u32> = None;
    let mut shown_since_report: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
            _ = frame_ticker.tick() => {
                if producer.is_finished() {
                    break;
                }

                let ratio = buffer.fill_ratio();
                if ratio < 1.0 {
                    let percent = (ratio * 100.0).floor() as u32;
                    if last_progress != Some(percent) {
                        info!("Buffering... {}%", percent);
                        last_progress = Some(percent);
                    }
                    continue;
                }

                match buffer.sample() {
                    Ok(frame) => {
                        let (x, y) = frame.random_placement(display);
                        trace!(width = frame.width(), height = frame.height(), x, y, "Show slide");
                        shown_since_report += 1;
                    }
                    // Memory-bound eviction can briefly empty a primed buffer
                    Err(BufferError::Empty) => debug!("Buffer empty, skipping frame"),
                }
            }
            _ = stats_ticker.tick(), if cli.debug => {
                let stats = buffer.stats();
                info!(
                    fps = shown_since_report,
                    memory_mb = probe.resident_bytes() / (1024 * 1024),
                    memory_percent = %format!("{:.1}", probe.usage_fraction() * 100.0),
                    slides = stats.len,
                    inserted = stats.inserted,
                    evicted = stats.evicted,
                    skipped = stats.skipped,
                    "Stats"
                );
                shown_since_report = 0;
            }
        }
    }

    match producer.stop().await {
        Ok(()) => {
            info!("Stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
