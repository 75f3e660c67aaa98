//! Messiness score: a pure, bounded function of a snapshot and standards.
//!
//! Five sub-scores, each capped at [`SUB_SCORE_CAP`], are summed and the total
//! is clamped to `[0, MAX_SCORE]`. Every sub-score is non-decreasing in its
//! violation count, so the total is too.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;
use crate::standards::Standards;

/// Upper bound of the total score.
pub const MAX_SCORE: f64 = 10.0;
/// Upper bound of each sub-score.
pub const SUB_SCORE_CAP: f64 = 2.0;

const DEPTH_WEIGHT: f64 = 0.4;
const NAMING_WEIGHT: f64 = 0.15;
const FORBIDDEN_WEIGHT: f64 = 0.2;
const OVERSIZED_WEIGHT: f64 = 0.3;
const DENSITY_WEIGHT: f64 = 0.25;

/// One scored category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Nesting beyond the configured depth.
    Depth,
    /// File naming rule violations.
    Naming,
    /// Forbidden pattern matches.
    Forbidden,
    /// Files above the size ceiling.
    Oversized,
    /// Directories holding too many files.
    Density,
}

impl Category {
    /// All categories in breakdown order.
    pub const ALL: [Category; 5] =
        [Self::Depth, Self::Naming, Self::Forbidden, Self::Oversized, Self::Density];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Depth => "excessive nesting",
            Self::Naming => "naming violations",
            Self::Forbidden => "forbidden patterns",
            Self::Oversized => "oversized files",
            Self::Density => "crowded directories",
        }
    }

    /// Suggested remedy used by the fallback narrative.
    #[must_use]
    pub fn remedy(self) -> &'static str {
        match self {
            Self::Depth => "Flatten deeply nested directories into fewer levels.",
            Self::Naming => "Rename files to lowercase names without spaces or special characters.",
            Self::Forbidden => "Delete or rename temporary, backup, and copy files.",
            Self::Oversized => "Move large files to external storage or archive them.",
            Self::Density => "Split crowded directories into topical subdirectories.",
        }
    }
}

/// Per-category contributions to the score, each in `[0, 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    /// Depth overage contribution.
    pub depth: f64,
    /// Naming violation contribution.
    pub naming: f64,
    /// Forbidden pattern contribution.
    pub forbidden: f64,
    /// Oversized file contribution.
    pub oversized: f64,
    /// Directory density contribution.
    pub density: f64,
}

impl SubScores {
    /// Sum of the sub-scores clamped to `[0, MAX_SCORE]`.
    #[must_use]
    pub fn total(&self) -> f64 {
        (self.depth + self.naming + self.forbidden + self.oversized + self.density)
            .clamp(0.0, MAX_SCORE)
    }

    /// Value of one category.
    #[must_use]
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Depth => self.depth,
            Category::Naming => self.naming,
            Category::Forbidden => self.forbidden,
            Category::Oversized => self.oversized,
            Category::Density => self.density,
        }
    }

    /// Non-zero categories, largest contribution first. Ties keep breakdown order.
    #[must_use]
    pub fn ranked(&self) -> Vec<(Category, f64)> {
        let mut ranked: Vec<(Category, f64)> = Category::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, value)| *value > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Computes the per-category breakdown for a snapshot.
#[must_use]
pub fn sub_scores(snapshot: &Snapshot, standards: &Standards) -> SubScores {
    let depth_overage = snapshot.max_depth.saturating_sub(standards.max_depth);
    let crowded = snapshot
        .files_per_dir
        .values()
        .filter(|count| **count > standards.max_files_per_dir)
        .count();

    SubScores {
        depth: weighted(depth_overage, DEPTH_WEIGHT),
        naming: weighted(snapshot.naming_violations.len(), NAMING_WEIGHT),
        forbidden: weighted(snapshot.forbidden_pattern_hits.len(), FORBIDDEN_WEIGHT),
        oversized: weighted(snapshot.oversized_files.len(), OVERSIZED_WEIGHT),
        density: weighted(crowded, DENSITY_WEIGHT),
    }
}

/// Computes the messiness score in `[0, 10]`.
#[must_use]
pub fn score(snapshot: &Snapshot, standards: &Standards) -> f64 {
    sub_scores(snapshot, standards).total()
}

#[allow(clippy::cast_precision_loss)]
fn weighted(count: usize, weight: f64) -> f64 {
    (count as f64 * weight).clamp(0.0, SUB_SCORE_CAP)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use chrono::Utc;

    use super::*;
    use crate::snapshot::{NamingRule, NamingViolation, OversizedFile, PatternHit};

    fn clean_snapshot() -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            root_path: PathBuf::from("/w"),
            total_files: 3,
            total_dirs: 1,
            max_depth: 2,
            files_per_dir: BTreeMap::from([(".".to_string(), 2), ("src".to_string(), 1)]),
            naming_violations: Vec::new(),
            oversized_files: Vec::new(),
            forbidden_pattern_hits: Vec::new(),
        }
    }

    fn with_violations(naming: usize, forbidden: usize, oversized: usize) -> Snapshot {
        let mut snapshot = clean_snapshot();
        snapshot.naming_violations = (0..naming)
            .map(|i| NamingViolation { path: format!("F{i}"), rule: NamingRule::LowercasePreferred })
            .collect();
        snapshot.forbidden_pattern_hits = (0..forbidden)
            .map(|i| PatternHit { path: format!("tmp{i}"), pattern: "tmp".into() })
            .collect();
        snapshot.oversized_files = (0..oversized)
            .map(|i| OversizedFile { path: format!("big{i}"), size: u64::MAX })
            .collect();
        snapshot
    }

    #[test]
    fn clean_snapshot_scores_zero() {
        let standards = Standards::default();
        assert_eq!(score(&clean_snapshot(), &standards), 0.0);
        assert!(sub_scores(&clean_snapshot(), &standards).ranked().is_empty());
    }

    #[test]
    fn depth_at_limit_scores_zero_and_overage_is_weighted() {
        let standards = Standards::default();
        let mut snapshot = clean_snapshot();
        snapshot.max_depth = standards.max_depth;
        assert_eq!(sub_scores(&snapshot, &standards).depth, 0.0);

        snapshot.max_depth = standards.max_depth + 2;
        assert!((sub_scores(&snapshot, &standards).depth - 0.8).abs() < 1e-9);

        snapshot.max_depth = standards.max_depth + 50;
        assert_eq!(sub_scores(&snapshot, &standards).depth, SUB_SCORE_CAP);
    }

    #[test]
    fn sub_scores_are_capped() {
        let standards = Standards::default();
        let subs = sub_scores(&with_violations(100, 100, 100), &standards);
        assert_eq!(subs.naming, 2.0);
        assert_eq!(subs.forbidden, 2.0);
        assert_eq!(subs.oversized, 2.0);
    }

    #[test]
    fn total_never_exceeds_ten() {
        let standards = Standards { max_files_per_dir: 0, ..Standards::default() };
        let mut snapshot = with_violations(500, 500, 500);
        snapshot.max_depth = 99;
        snapshot.files_per_dir = (0..20).map(|i| (format!("d{i}"), 5)).collect();
        assert_eq!(score(&snapshot, &standards), MAX_SCORE);
    }

    #[test]
    fn superset_of_violations_never_scores_lower() {
        let standards = Standards::default();
        for base in 0..15 {
            let smaller = with_violations(base, base / 2, base / 3);
            let larger = with_violations(base + 1, base / 2 + 1, base / 3 + 1);
            assert!(score(&larger, &standards) >= score(&smaller, &standards));
        }
    }

    #[test]
    fn density_counts_crowded_directories() {
        let standards = Standards::default();
        let mut snapshot = clean_snapshot();
        snapshot.files_per_dir.insert("inbox".into(), 21);
        snapshot.files_per_dir.insert("archive".into(), 20);
        assert_eq!(sub_scores(&snapshot, &standards).density, 0.25);
    }

    #[test]
    fn score_is_pure() {
        let standards = Standards::default();
        let snapshot = with_violations(3, 2, 1);
        let first = score(&snapshot, &standards);
        let second = score(&snapshot.clone(), &standards.clone());
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn identical_counts_give_identical_scores() {
        let standards = Standards::default();
        let a = with_violations(4, 1, 0);
        let mut b = with_violations(4, 1, 0);
        b.naming_violations[0].path = "Other Name".into();
        b.naming_violations[0].rule = NamingRule::NoSpaces;
        assert_eq!(score(&a, &standards).to_bits(), score(&b, &standards).to_bits());
    }

    #[test]
    fn ranked_orders_by_contribution() {
        let subs = SubScores { depth: 0.4, naming: 2.0, forbidden: 0.0, oversized: 0.9, density: 0.4 };
        let order: Vec<Category> = subs.ranked().into_iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![Category::Naming, Category::Oversized, Category::Depth, Category::Density]);
    }
}
