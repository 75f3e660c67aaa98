//! `tidyscan stats` command.

use std::fmt::Write;

use super::open_store;
use crate::config::Settings;
use crate::store::StoreStats;

/// Execute the `stats` command.
///
/// # Errors
///
/// Returns an error string if the history cannot be read.
pub fn run(settings: &Settings) -> Result<(), String> {
    let store = open_store(settings)?;
    let stats = store.stats().map_err(|e| e.to_string())?;
    print!("{}", render(&stats));
    Ok(())
}

pub(crate) fn render(stats: &StoreStats) -> String {
    if stats.total_scans == 0 {
        return "No scans recorded yet.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Total scans:      {}", stats.total_scans);
    let _ = writeln!(out, "Average score:    {:.2}", stats.avg_score);
    let _ = writeln!(out, "Best score:       {:.2}", stats.min_score);
    let _ = writeln!(out, "Worst score:      {:.2}", stats.max_score);
    let _ = writeln!(out, "Average files:    {:.0}", stats.avg_files);
    let _ = writeln!(out, "Average dirs:     {:.0}", stats.avg_dirs);
    let _ = writeln!(out, "Alerts raised:    {}", stats.alerts);
    out
}
