//! Deterministic text summary of a snapshot, used as embedding input.

use std::fmt::Write;

use crate::snapshot::Snapshot;

/// Maximum listed items per violation kind.
const LIST_LIMIT: usize = 20;
/// Number of busiest directories listed.
const BUSIEST_DIRS: usize = 5;

/// Renders the counts and violation lists of a snapshot as stable text.
///
/// Two snapshots with the same counts and violations produce the same text
/// regardless of when or where they were taken.
#[must_use]
pub fn summarize(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "files: {}", snapshot.total_files);
    let _ = writeln!(out, "directories: {}", snapshot.total_dirs);
    let _ = writeln!(out, "max depth: {}", snapshot.max_depth);
    let _ = writeln!(out, "naming violations: {}", snapshot.naming_violations.len());
    let _ = writeln!(out, "forbidden pattern hits: {}", snapshot.forbidden_pattern_hits.len());
    let _ = writeln!(out, "oversized files: {}", snapshot.oversized_files.len());

    let busiest: Vec<String> = snapshot
        .crowded_dirs(0)
        .into_iter()
        .take(BUSIEST_DIRS)
        .map(|(dir, count)| format!("{dir} ({count})"))
        .collect();
    if !busiest.is_empty() {
        let _ = writeln!(out, "busiest directories: {}", busiest.join(", "));
    }

    for v in snapshot.naming_violations.iter().take(LIST_LIMIT) {
        let _ = writeln!(out, "naming {}: {}", v.rule, v.path);
    }
    for hit in snapshot.forbidden_pattern_hits.iter().take(LIST_LIMIT) {
        let _ = writeln!(out, "forbidden {}: {}", hit.pattern, hit.path);
    }
    for file in snapshot.oversized_files.iter().take(LIST_LIMIT) {
        let _ = writeln!(out, "oversized {} bytes: {}", file.size, file.path);
    }
    out
}
