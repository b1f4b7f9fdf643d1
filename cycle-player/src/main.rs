//! Cycle Player (cycle-player) - Main entry point
//!
//! Runs a practice session from a catalog file against a simulated output
//! device, printing every player event as a JSON line on stdout.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cycle_common::events::PlayerEvent;
use cycle_common::PlayerConfig;
use cycle_player::audio::{MemoryObjectUrls, SimulatedOutput};
use cycle_player::content::{CatalogFile, DirectoryCatalog, DirectoryResolver};
use cycle_player::degradation::DegradationController;
use cycle_player::playback::{CyclePlayer, Session, SessionQueue};
use cycle_player::SharedState;
use tokio::signal;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cycle-player
#[derive(Parser, Debug)]
#[command(name = "cycle-player")]
#[command(about = "Resilient four-phase cycle player")]
#[command(version)]
struct Args {
    /// Config file (falls back to CYCLE_PLAYER_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog TOML listing the session's cycles in order
    #[arg(long, env = "CYCLE_PLAYER_CATALOG")]
    catalog: PathBuf,

    /// Directory holding cached audio files named <audio_id>.mp3
    #[arg(long, env = "CYCLE_PLAYER_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Base URL for streaming audio that is not cached
    #[arg(long, env = "CYCLE_PLAYER_REMOTE_BASE")]
    remote_base: Option<String>,

    /// Start offline
    #[arg(long)]
    offline: bool,

    /// Seed for degraded-mode picks
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<usize>,

    /// Simulated length of every audio segment
    #[arg(long, default_value = "2000")]
    segment_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cycle_player=debug,cycle_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = PlayerConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let catalog = CatalogFile::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;

    info!(
        "Starting cycle player: {} cycles, cache {}",
        catalog.cycles.len(),
        args.cache_dir.display()
    );

    let state = Arc::new(SharedState::new(config.event_capacity));
    let printer_done = CancellationToken::new();
    let printer = spawn_event_printer(&state, printer_done.clone(), std::io::stdout());

    let mut resolver = DirectoryResolver::new(&args.cache_dir);
    if let Some(base) = &args.remote_base {
        resolver = resolver.with_remote_base(base.clone());
    }

    let output = Arc::new(SimulatedOutput::new(Duration::from_millis(args.segment_ms)));
    let player = Arc::new(CyclePlayer::new(
        output,
        Arc::new(MemoryObjectUrls::new()),
        Arc::new(resolver),
        Arc::clone(&state),
        &config,
    ));

    let cache = Arc::new(DirectoryCatalog::new(catalog.cycles.clone(), &args.cache_dir));
    let mut controller = DegradationController::new(cache, state.event_bus(), &config);
    if let Some(seed) = args.seed {
        controller = controller.with_seed(seed);
    }
    controller.set_online(!args.offline);

    let mut session = Session::new(SessionQueue::new(catalog.cycles), controller, player);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    let summary = session.run(cancel, args.cycles).await;
    info!(
        "Finished ({}): {} played, {} degraded, {} failed, {} watchdog interventions",
        summary.reason,
        summary.played,
        summary.degraded,
        summary.failed,
        state.watchdog_interventions()
    );

    printer_done.cancel();
    if let Err(e) = printer.await {
        warn!("Event printer failed: {}", e);
    }
    Ok(())
}

/// Print every event as a JSON line
///
/// Once `done` fires, whatever is still buffered is printed before returning.
fn spawn_event_printer<W>(
    state: &Arc<SharedState>,
    done: CancellationToken,
    mut out: W,
) -> tokio::task::JoinHandle<()>
where
    W: Write + Send + 'static,
{
    let mut rx = state.subscribe_events();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Ok(event) => print_event(&mut out, &event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event printer lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return,
                },
                _ = done.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(event) => print_event(&mut out, &event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, skipped {} events", skipped);
                }
                Err(_) => break,
            }
        }
    })
}

fn print_event(out: &mut impl Write, event: &PlayerEvent) {
    let written = serde_json::to_string(event)
        .map_err(std::io::Error::from)
        .and_then(|line| writeln!(out, "{}", line));
    if let Err(e) = written {
        warn!("Failed to print {} event: {}", event.event_type(), e);
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
