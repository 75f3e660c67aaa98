//! `tidyscan watch` command.

use std::path::Path;
use std::time::Duration;

use super::scan::resolve_root;
use super::start_monitor;
use crate::cli::CycleArgs;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::monitor::CycleOutcome;

/// Execute the `watch` command.
///
/// Runs a cycle every `interval_secs` seconds until `cycles` cycles have run,
/// or forever. A failed cycle is reported and the next tick proceeds.
///
/// # Errors
///
/// Returns an error string if the monitor cannot be started.
pub async fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    path: &Path,
    interval_secs: u64,
    cycles: Option<u64>,
    cycle: &CycleArgs,
) -> Result<(), String> {
    let root = resolve_root(path)?;
    let monitor = start_monitor(ctx, settings, cycle).await?;
    let interval = Duration::from_secs(interval_secs.max(1));
    println!("Watching {} every {}s", root.display(), interval.as_secs());

    let mut completed = 0u64;
    while cycles.map_or(true, |limit| completed < limit) {
        if completed > 0 {
            tokio::time::sleep(interval).await;
        }
        match monitor.run_cycle(ctx, &root).await {
            Ok(outcome) => println!("{}", status_line(&outcome)),
            Err(e) => {
                log::error!("scan cycle failed: {e}");
                eprintln!("Cycle failed: {e}");
            }
        }
        completed += 1;
    }
    Ok(())
}

/// One-line summary printed after each cycle.
pub(crate) fn status_line(outcome: &CycleOutcome) -> String {
    let marker = if outcome.report.alert { "ALERT" } else { "ok" };
    let degraded = if outcome.degradations.is_empty() { "" } else { " (degraded)" };
    format!(
        "[{}] entry {}: score {:.1}/10 {marker}{degraded}",
        outcome.snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"),
        outcome.entry_id,
        outcome.report.score
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CycleArgs;
    use crate::testing::{HistogramEmbedder, StubLlm};

    fn settings(dir: &Path) -> Settings {
        let mut settings =
            Settings::resolve(&crate::cli::GlobalArgs::default(), |_| None::<String>);
        settings.db_path = dir.join("history.db");
        settings.standards_path = dir.join("missing.yaml");
        settings
    }

    #[tokio::test(start_paused = true)]
    async fn watch_stops_after_cycle_limit() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::write(tree.path().join("Notes File.txt"), "x").unwrap();
        let state = tempfile::tempdir().unwrap();
        let settings = settings(state.path());

        let ctx = ServiceContext::from_parts(
            Box::new(crate::adapters::live::LiveClock),
            Box::new(crate::adapters::live::LiveFileSystem),
            Box::new(StubLlm::Answer("Fine.".into())),
            Box::new(HistogramEmbedder::working()),
        );
        let cycle = CycleArgs { alert_threshold: None, top_k: 5 };

        run(&ctx, &settings, tree.path(), 60, Some(3), &cycle).await.unwrap();

        let store = crate::store::SnapshotStore::open(&settings.db_path).unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cycle_limit_scans_nothing() {
        let tree = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let settings = settings(state.path());
        let ctx = ServiceContext::from_parts(
            Box::new(crate::adapters::live::LiveClock),
            Box::new(crate::adapters::live::LiveFileSystem),
            Box::new(StubLlm::Answer("Fine.".into())),
            Box::new(HistogramEmbedder::working()),
        );
        let cycle = CycleArgs { alert_threshold: None, top_k: 5 };

        run(&ctx, &settings, tree.path(), 60, Some(0), &cycle).await.unwrap();

        let store = crate::store::SnapshotStore::open(&settings.db_path).unwrap();
        assert!(store.is_empty().unwrap());
    }
}
