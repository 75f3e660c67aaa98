//! `tidyscan trend` command.

use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};

use super::open_store;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::store::{StoredEntry, TimeRange};
use crate::trend::{analyze, sparkline, Direction, TREND_WINDOW_DAYS};

/// Execute the `trend` command.
///
/// # Errors
///
/// Returns an error string if the history cannot be read.
pub fn run(ctx: &ServiceContext, settings: &Settings, days: i64, width: usize) -> Result<(), String> {
    let now = ctx.clock.now();
    let start = window_start(now, days)?;
    let store = open_store(settings)?;
    let entries = store.query(TimeRange::since(start)).map_err(|e| e.to_string())?;
    print!("{}", render(&entries, now, days, width));
    Ok(())
}

/// Start of a window of `days` days ending at `now`.
pub(crate) fn window_start(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, String> {
    Duration::try_days(days.max(1))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| format!("--days {days} reaches outside the supported date range"))
}

pub(crate) fn render(entries: &[StoredEntry], now: DateTime<Utc>, days: i64, width: usize) -> String {
    if entries.is_empty() {
        return format!("No scans in the last {days} days.\n");
    }
    let trend = analyze(entries, now);
    let scores: Vec<f64> = entries.iter().map(|e| e.entry.score).collect();

    let mut out = String::new();
    let _ = writeln!(out, "Last {days} days, {} scans", trend.scans);
    let _ = writeln!(out, "{}", sparkline(&scores, width));
    let _ = writeln!(out);
    match (trend.recent_average, trend.previous_average) {
        (Some(recent), Some(previous)) => {
            let _ = writeln!(
                out,
                "Trend: {} ({:+.2}; last {TREND_WINDOW_DAYS} days {recent:.2} vs previous {previous:.2})",
                trend.direction.as_str(),
                trend.delta
            );
        }
        _ => {
            let _ = writeln!(
                out,
                "Trend: {} (need scans in both of the last two {TREND_WINDOW_DAYS}-day windows)",
                Direction::Stable.as_str()
            );
        }
    }
    let _ = writeln!(
        out,
        "Alerts: {} of {} ({:.0}%), current streak {}",
        trend.alerts,
        trend.scans,
        trend.alert_rate * 100.0,
        trend.alert_streak
    );
    out
}
