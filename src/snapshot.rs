//! Snapshot data model: the immutable result of one directory scan.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which naming convention a file broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingRule {
    /// The name contains whitespace.
    NoSpaces,
    /// The name contains a configured special character.
    SpecialCharacters,
    /// The name contains uppercase letters.
    LowercasePreferred,
}

impl NamingRule {
    /// Stable identifier used in prompts and exports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSpaces => "no_spaces",
            Self::SpecialCharacters => "special_characters",
            Self::LowercasePreferred => "lowercase_preferred",
        }
    }
}

impl fmt::Display for NamingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file whose name broke a naming rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingViolation {
    /// Path relative to the scan root.
    pub path: String,
    /// Rule that was broken.
    pub rule: NamingRule,
}

/// A file larger than the configured ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OversizedFile {
    /// Path relative to the scan root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// A file whose name contains a forbidden pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHit {
    /// Path relative to the scan root.
    pub path: String,
    /// The configured pattern that matched.
    pub pattern: String,
}

/// Structural metrics captured by one scan.
///
/// Never mutated after the scanner returns it; scores and reports are stored
/// alongside it in the history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the scan completed.
    pub timestamp: DateTime<Utc>,
    /// Absolute path that was scanned.
    pub root_path: PathBuf,
    /// Number of regular files visited.
    pub total_files: usize,
    /// Number of directories visited below the root.
    pub total_dirs: usize,
    /// Nesting level of the deepest visited directory (root = 0).
    pub max_depth: usize,
    /// File count per visited directory, keyed by path relative to the root.
    pub files_per_dir: BTreeMap<String, usize>,
    /// Naming violations in traversal order.
    pub naming_violations: Vec<NamingViolation>,
    /// Oversized files in traversal order.
    pub oversized_files: Vec<OversizedFile>,
    /// Forbidden pattern matches in traversal order.
    pub forbidden_pattern_hits: Vec<PatternHit>,
}

impl Snapshot {
    /// Directories holding more files than `limit`, largest first.
    #[must_use]
    pub fn crowded_dirs(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut crowded: Vec<(&str, usize)> = self
            .files_per_dir
            .iter()
            .filter(|(_, count)| **count > limit)
            .map(|(dir, count)| (dir.as_str(), *count))
            .collect();
        crowded.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        crowded
    }

    /// Total number of recorded violations of every kind.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.naming_violations.len() + self.oversized_files.len() + self.forbidden_pattern_hits.len()
    }
}
