//! Metrics scanner: walks a directory tree and builds a [`Snapshot`].
//!
//! All filesystem access goes through the `FileSystem` port so scans can run
//! against the real disk or an in-memory tree in tests. A root given as a
//! symbolic link is resolved once; links found during the walk are never
//! followed and count as neither file nor directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ScanError;
use crate::ports::{Clock, EntryKind, FileSystem};
use crate::snapshot::{NamingRule, NamingViolation, OversizedFile, PatternHit, Snapshot};
use crate::standards::{NamingRules, Standards};

/// Directory names skipped when no ignore list is configured.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    ".cache",
    "target",
];

/// Returns [`DEFAULT_IGNORE_PATTERNS`] as owned strings.
#[must_use]
pub fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|p| (*p).to_string()).collect()
}

/// Scans the tree rooted at `root` and returns its snapshot.
///
/// Entries whose name equals one of `ignore_patterns` are skipped together
/// with everything beneath them. The snapshot timestamp is taken from `clock`
/// once the walk has finished.
///
/// # Errors
///
/// Returns [`ScanError`] if the root is missing or not a directory, or if any
/// directory in the walk cannot be read. Partial results are discarded.
pub fn scan(
    fs: &dyn FileSystem,
    clock: &dyn Clock,
    root: &Path,
    standards: &Standards,
    ignore_patterns: &[String],
) -> Result<Snapshot, ScanError> {
    // The root itself may be a link; nothing below it is followed.
    let walk_root =
        fs.canonicalize(root).map_err(|_| ScanError::MissingRoot(root.to_path_buf()))?;
    match fs.entry_kind(&walk_root) {
        Ok(EntryKind::Directory) => {}
        Ok(_) => return Err(ScanError::NotADirectory(root.to_path_buf())),
        Err(_) => return Err(ScanError::MissingRoot(root.to_path_buf())),
    }

    let mut tally = Tally::default();
    // (absolute path, path relative to root, depth)
    let mut pending: Vec<(PathBuf, String, usize)> = vec![(walk_root, ".".into(), 0)];

    while let Some((dir, relative, depth)) = pending.pop() {
        let entries = fs
            .read_dir(&dir)
            .map_err(|e| ScanError::Unreadable { path: dir.clone(), message: e.to_string() })?;

        tally.max_depth = tally.max_depth.max(depth);
        let mut file_count = 0;
        let mut subdirs = Vec::new();

        for entry in entries {
            if ignore_patterns.iter().any(|pattern| *pattern == entry.name) {
                log::debug!("skipping ignored entry {}", dir.join(&entry.name).display());
                continue;
            }
            let entry_relative = join_relative(&relative, &entry.name);
            match entry.kind {
                EntryKind::File { size } => {
                    file_count += 1;
                    tally.record_file(&entry.name, entry_relative, size, standards);
                }
                EntryKind::Directory => {
                    tally.total_dirs += 1;
                    subdirs.push((dir.join(&entry.name), entry_relative, depth + 1));
                }
                EntryKind::Symlink | EntryKind::Other => {}
            }
        }

        tally.files_per_dir.insert(relative, file_count);
        // Reverse so the stack pops subdirectories in name order.
        pending.extend(subdirs.into_iter().rev());
    }

    log::debug!(
        "scanned {}: {} files, {} dirs, depth {}",
        root.display(),
        tally.total_files,
        tally.total_dirs,
        tally.max_depth
    );

    Ok(Snapshot {
        timestamp: clock.now(),
        root_path: root.to_path_buf(),
        total_files: tally.total_files,
        total_dirs: tally.total_dirs,
        max_depth: tally.max_depth,
        files_per_dir: tally.files_per_dir,
        naming_violations: tally.naming_violations,
        oversized_files: tally.oversized_files,
        forbidden_pattern_hits: tally.forbidden_pattern_hits,
    })
}

/// Running counters for a scan in progress.
#[derive(Default)]
struct Tally {
    total_files: usize,
    total_dirs: usize,
    max_depth: usize,
    files_per_dir: BTreeMap<String, usize>,
    naming_violations: Vec<NamingViolation>,
    oversized_files: Vec<OversizedFile>,
    forbidden_pattern_hits: Vec<PatternHit>,
}

impl Tally {
    fn record_file(&mut self, name: &str, path: String, size: u64, standards: &Standards) {
        self.total_files += 1;

        if let Some(pattern) = forbidden_match(name, &standards.forbidden_patterns) {
            self.forbidden_pattern_hits
                .push(PatternHit { path: path.clone(), pattern: pattern.to_string() });
        }
        if let Some(rule) = naming_violation(name, &standards.naming) {
            self.naming_violations.push(NamingViolation { path: path.clone(), rule });
        }
        if size > standards.max_file_size {
            self.oversized_files.push(OversizedFile { path, size });
        }
    }
}

fn join_relative(parent: &str, name: &str) -> String {
    if parent == "." {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// First configured pattern contained in `name`, compared case-insensitively.
fn forbidden_match<'a>(name: &str, patterns: &'a [String]) -> Option<&'a str> {
    let lowered = name.to_lowercase();
    patterns
        .iter()
        .find(|pattern| !pattern.is_empty() && lowered.contains(&pattern.to_lowercase()))
        .map(String::as_str)
}

/// First naming rule `name` breaks. Whitespace wins over special characters,
/// which win over case.
fn naming_violation(name: &str, rules: &NamingRules) -> Option<NamingRule> {
    if rules.no_spaces && name.chars().any(char::is_whitespace) {
        Some(NamingRule::NoSpaces)
    } else if name.chars().any(|c| rules.special_characters.contains(&c)) {
        Some(NamingRule::SpecialCharacters)
    } else if rules.lowercase_preferred && name.chars().any(char::is_uppercase) {
        Some(NamingRule::LowercasePreferred)
    } else {
        None
    }
}
