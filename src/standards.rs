//! Development standards describing what a tidy directory looks like.
//!
//! Standards are loaded once per process and passed by reference into the
//! scanner and the score function. Nothing mutates them after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ports::FileSystem;

/// Default file size ceiling: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Naming conventions checked for every file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Flag names containing whitespace.
    pub no_spaces: bool,
    /// Flag names containing uppercase letters.
    pub lowercase_preferred: bool,
    /// Characters that should not appear in file names.
    pub special_characters: Vec<char>,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            no_spaces: true,
            lowercase_preferred: true,
            special_characters: vec!['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'],
        }
    }
}

/// Configuration describing the desired directory shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Standards {
    /// Deepest acceptable directory nesting (root = 0).
    pub max_depth: usize,
    /// Files a single directory may hold before it counts as crowded.
    pub max_files_per_dir: usize,
    /// Case-insensitive substrings that should not appear in file names.
    pub forbidden_patterns: Vec<String>,
    /// Expected top-level directory names.
    pub recommended_structure: Vec<String>,
    /// File naming conventions.
    pub naming: NamingRules,
    /// Size in bytes above which a file is reported as oversized.
    pub max_file_size: u64,
}

impl Default for Standards {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_files_per_dir: 20,
            forbidden_patterns: [
                "Untitled",
                "New Folder",
                "Copy of",
                "- Copy",
                "temp",
                "tmp",
                "backup",
                "old",
                "~$",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            recommended_structure: ["src", "tests", "docs", "config", "scripts", "data", "assets"]
                .into_iter()
                .map(String::from)
                .collect(),
            naming: NamingRules::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Standards {
    /// Loads standards from a YAML or JSON document, falling back to defaults.
    ///
    /// A missing file yields [`Standards::default`]; keys absent from the
    /// document keep their default values. Duplicate forbidden patterns are
    /// dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(fs: &dyn FileSystem, path: Option<&Path>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !fs.exists(path) {
            log::info!("standards file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs
            .read_to_string(path)
            .map_err(|e| format!("Failed to read standards {}: {e}", path.display()))?;
        let mut standards = Self::parse(&contents)
            .map_err(|e| format!("Failed to parse standards {}: {e}", path.display()))?;
        standards.dedup_patterns();
        Ok(standards)
    }

    /// Parses a standards document. JSON is accepted because it is valid YAML.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the document is malformed.
    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Serializes the standards as an editable YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yaml::to_string(self).map_err(|e| format!("Failed to serialize standards: {e}"))
    }

    fn dedup_patterns(&mut self) {
        let mut seen = Vec::with_capacity(self.forbidden_patterns.len());
        self.forbidden_patterns.retain(|pattern| {
            let key = pattern.to_lowercase();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
    }
}
