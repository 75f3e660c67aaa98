//! `tidyscan history` command.

use std::fmt::Write;

use super::{first_line, open_store};
use crate::config::Settings;
use crate::store::StoredEntry;

const NARRATIVE_WIDTH: usize = 60;

/// Execute the `history` command.
///
/// Lists the `limit` most recent scans, newest first.
///
/// # Errors
///
/// Returns an error string if the history cannot be read.
pub fn run(settings: &Settings, limit: usize) -> Result<(), String> {
    let store = open_store(settings)?;
    let entries = store.latest(limit).map_err(|e| e.to_string())?;
    print!("{}", render(&entries));
    Ok(())
}

/// Formats entries as a table.
pub(crate) fn render(entries: &[StoredEntry]) -> String {
    if entries.is_empty() {
        return "No scans recorded yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:>5}  {:<19}  {:>5}  {:<5}  SUMMARY", "ID", "SCANNED", "SCORE", "ALERT");
    let _ = writeln!(out, "{:->5}  {:-<19}  {:->5}  {:-<5}  {:-<7}", "", "", "", "", "");
    for stored in entries {
        let entry = &stored.entry;
        let (alert, summary) = match &entry.report {
            Some(report) => (
                if report.alert { "yes" } else { "no" },
                first_line(&report.narrative, NARRATIVE_WIDTH),
            ),
            None => ("-", "(no report)".to_string()),
        };
        let _ = writeln!(
            out,
            "{:>5}  {:<19}  {:>5.1}  {alert:<5}  {summary}",
            stored.id.to_string(),
            entry.snapshot.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.score
        );
    }
    out
}
