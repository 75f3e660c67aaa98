//! `tidyscan scan` command.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::start_monitor;
use crate::cli::CycleArgs;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::monitor::CycleOutcome;
use crate::retrieval::Neighbor;
use crate::report::Report;
use crate::score::Category;
use crate::snapshot::Snapshot;
use crate::store::EntryId;

/// Execute the `scan` command.
///
/// Runs one monitoring cycle over `path` and prints the report.
///
/// # Errors
///
/// Returns an error string if the tree cannot be scanned or the history
/// cannot be written. Model failures only degrade the report.
pub async fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    path: &Path,
    cycle: &CycleArgs,
    json: bool,
) -> Result<(), String> {
    let root = resolve_root(path)?;
    let monitor = start_monitor(ctx, settings, cycle).await?;
    let outcome = monitor.run_cycle(ctx, &root).await.map_err(|e| e.to_string())?;

    if json {
        println!("{}", render_json(&outcome)?);
    } else {
        print!("{}", render_outcome(&outcome));
    }
    Ok(())
}

/// Makes a scan root absolute against the working directory.
pub(crate) fn resolve_root(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to determine working directory: {e}"))?;
    let joined = cwd.join(path);
    // Canonical form keeps history comparable across `.` and `./` spellings.
    Ok(std::fs::canonicalize(&joined).unwrap_or(joined))
}

#[derive(Serialize)]
struct ScanSummary<'a> {
    entry_id: EntryId,
    snapshot: &'a Snapshot,
    report: &'a Report,
    neighbors: &'a [Neighbor],
    degradations: Vec<String>,
}

/// Renders a cycle outcome as pretty JSON.
pub(crate) fn render_json(outcome: &CycleOutcome) -> Result<String, String> {
    let summary = ScanSummary {
        entry_id: outcome.entry_id,
        snapshot: &outcome.snapshot,
        report: &outcome.report,
        neighbors: &outcome.neighbors,
        degradations: outcome.degradations.iter().map(ToString::to_string).collect(),
    };
    serde_json::to_string_pretty(&summary).map_err(|e| format!("Failed to serialize report: {e}"))
}

/// Renders a cycle outcome for the terminal.
pub(crate) fn render_outcome(outcome: &CycleOutcome) -> String {
    let s = &outcome.snapshot;
    let r = &outcome.report;
    let mut out = String::new();

    let _ = writeln!(out, "Scanned {} at {}", s.root_path.display(), s.timestamp.to_rfc3339());
    let _ = writeln!(
        out,
        "  files: {}  directories: {}  max depth: {}",
        s.total_files, s.total_dirs, s.max_depth
    );
    let _ = writeln!(
        out,
        "  naming violations: {}  forbidden hits: {}  oversized files: {}",
        s.naming_violations.len(),
        s.forbidden_pattern_hits.len(),
        s.oversized_files.len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Messiness score: {:.2}/10 (entry {})", r.score, outcome.entry_id);
    for category in Category::ALL {
        let _ = writeln!(out, "  {:<20} {:.2}", category.label(), r.sub_scores.get(category));
    }
    if r.alert {
        let _ = writeln!(out, "ALERT: messiness score {:.1}/10", r.score);
    } else {
        let _ = writeln!(out, "OK: below alert threshold");
    }
    let _ = writeln!(out, "Similar past scans: {}", outcome.neighbors.len());
    for degradation in &outcome.degradations {
        let _ = writeln!(out, "Degraded: {degradation}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", r.narrative);
    out
}
