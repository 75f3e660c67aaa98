//! Trend analysis over stored history: direction, alerts, and a sparkline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoredEntry;

/// Length of each comparison window.
pub const TREND_WINDOW_DAYS: i64 = 7;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Which way the score is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Recent scores are lower than before.
    Improving,
    /// Recent scores are higher than before.
    Worsening,
    /// No change, or not enough history to compare.
    Stable,
}

impl Direction {
    /// Lowercase name for display.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Worsening => "worsening",
            Self::Stable => "stable",
        }
    }
}

/// Summary of how the score has evolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Direction of the last window against the one before it.
    pub direction: Direction,
    /// `recent_average - previous_average`; zero when either is missing.
    pub delta: f64,
    /// Mean score over the last [`TREND_WINDOW_DAYS`] days.
    pub recent_average: Option<f64>,
    /// Mean score over the [`TREND_WINDOW_DAYS`] days before that.
    pub previous_average: Option<f64>,
    /// Scans considered.
    pub scans: usize,
    /// Scans whose report raised an alert.
    pub alerts: usize,
    /// `alerts / scans`, zero without scans.
    pub alert_rate: f64,
    /// Consecutive alerts ending at the newest scan.
    pub alert_streak: usize,
}

/// Summarizes `entries` (oldest first) as seen at `now`.
#[must_use]
pub fn analyze(entries: &[StoredEntry], now: DateTime<Utc>) -> TrendSummary {
    let window = Duration::days(TREND_WINDOW_DAYS);
    let recent_start = now - window;
    let previous_start = recent_start - window;

    let recent = average(entries.iter().filter(|e| {
        let t = e.entry.snapshot.timestamp;
        t >= recent_start && t <= now
    }));
    let previous = average(entries.iter().filter(|e| {
        let t = e.entry.snapshot.timestamp;
        t >= previous_start && t < recent_start
    }));

    let (direction, delta) = match (recent, previous) {
        (Some(r), Some(p)) if r < p => (Direction::Improving, r - p),
        (Some(r), Some(p)) if r > p => (Direction::Worsening, r - p),
        _ => (Direction::Stable, 0.0),
    };

    let alerted = |e: &&StoredEntry| e.entry.report.as_ref().is_some_and(|r| r.alert);
    let alerts = entries.iter().filter(alerted).count();
    let alert_streak = entries.iter().rev().take_while(alerted).count();

    TrendSummary {
        direction,
        delta,
        recent_average: recent,
        previous_average: previous,
        scans: entries.len(),
        alerts,
        alert_rate: ratio(alerts, entries.len()),
        alert_streak,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn average<'a>(entries: impl Iterator<Item = &'a StoredEntry>) -> Option<f64> {
    let (sum, n) = entries.fold((0.0, 0usize), |(sum, n), e| (sum + e.entry.score, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Renders `scores` as an eight-level bar string at most `width` characters wide.
///
/// Values are scaled between the series minimum and maximum; a flat series
/// renders at the lowest level. Longer series are down-sampled.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sparkline(scores: &[f64], width: usize) -> String {
    if scores.is_empty() || width == 0 {
        return String::new();
    }
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };
    let top = SPARK_LEVELS.len() - 1;

    let level = |v: f64| -> char {
        let scaled = ((v - min) / range * top as f64) as usize;
        SPARK_LEVELS[scaled.min(top)]
    };

    if scores.len() <= width {
        return scores.iter().map(|v| level(*v)).collect();
    }
    let step = scores.len() as f64 / width as f64;
    (0..width).map(|i| level(scores[((i as f64 * step) as usize).min(scores.len() - 1)])).collect()
}
