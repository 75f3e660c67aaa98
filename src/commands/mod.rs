//! Command dispatch and handlers.

pub mod doctor;
pub mod export;
pub mod history;
pub mod reconcile;
pub mod scan;
pub mod standards;
pub mod stats;
pub mod trend;
pub mod watch;

use std::env;
use std::path::Path;

use crate::cassette::session::RecordingSession;
use crate::cli::{Cli, Command, CycleArgs};
use crate::config::{Settings, ENV_RECORD};
use crate::context::ServiceContext;
use crate::monitor::Monitor;
use crate::standards::Standards;
use crate::store::SnapshotStore;

/// Dispatch a parsed command line to its handler.
///
/// When `TIDYSCAN_RECORD` is set to a directory path, clock, model, and
/// embedder interactions are recorded to per-port cassette files below it.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings = Settings::from_args(&cli.global);
    let session = match env::var(ENV_RECORD) {
        Ok(dir) if !dir.trim().is_empty() => Some(RecordingSession::new(Path::new(&dir))?),
        _ => None,
    };
    let ctx = match &session {
        Some(session) => ServiceContext::recording(&settings, session),
        None => ServiceContext::live(&settings),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let result = runtime.block_on(dispatch_with_context(&cli.command, &ctx, &settings));

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release recorder references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub async fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    settings: &Settings,
) -> Result<(), String> {
    match command {
        Command::Scan { path, cycle, json } => scan::run(ctx, settings, path, cycle, *json).await,
        Command::Watch { path, interval_secs, cycles, cycle } => {
            watch::run(ctx, settings, path, *interval_secs, *cycles, cycle).await
        }
        Command::History { limit } => history::run(settings, *limit),
        Command::Stats => stats::run(settings),
        Command::Trend { days, width } => trend::run(ctx, settings, *days, *width),
        Command::Export { id, output } => export::run(ctx, settings, *id, output),
        Command::Reconcile => reconcile::run(ctx, settings).await,
        Command::Standards { output, force } => {
            standards::run(ctx, settings, output.as_deref(), *force)
        }
        Command::Doctor => doctor::run(ctx, settings).await,
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}

/// Opens the configured history database.
pub(crate) fn open_store(settings: &Settings) -> Result<SnapshotStore, String> {
    SnapshotStore::open(&settings.db_path)
        .map_err(|e| format!("Failed to open history {}: {e}", settings.db_path.display()))
}

/// Loads the configured standards, or defaults when the file is absent.
pub(crate) fn load_standards(ctx: &ServiceContext, settings: &Settings) -> Result<Standards, String> {
    Standards::load(ctx.fs.as_ref(), Some(&settings.standards_path))
}

/// Opens the store, loads standards, and starts a reconciled monitor.
pub(crate) async fn start_monitor(
    ctx: &ServiceContext,
    settings: &Settings,
    cycle: &CycleArgs,
) -> Result<Monitor, String> {
    let store = open_store(settings)?;
    let standards = load_standards(ctx, settings)?;
    let options = settings.monitor_options(cycle.alert_threshold, cycle.top_k);
    let (monitor, reconciled) = Monitor::start(ctx, store, standards, options)
        .await
        .map_err(|e| e.to_string())?;
    if reconciled.missing > 0 {
        eprintln!(
            "Warning: {} stored scan(s) have no similarity vector; run `tidyscan reconcile` once the embedder is reachable.",
            reconciled.missing
        );
    }
    Ok(monitor)
}

/// First line of a narrative, shortened to `max` characters.
pub(crate) fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
