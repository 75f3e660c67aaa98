//! Export of a single history entry as a standalone document.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::FileSystem;
use crate::store::{StoreStats, StoredEntry};

/// Document written by `tidyscan export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// When the document was produced.
    pub generated: DateTime<Utc>,
    /// The exported entry, including its report if one was attached.
    pub entry: StoredEntry,
    /// History-wide statistics at export time.
    pub statistics: StoreStats,
}

/// Serialization chosen from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl ExportFormat {
    /// `.yaml` and `.yml` select YAML; anything else is JSON.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl ExportDocument {
    /// Serializes the document in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render(&self, format: ExportFormat) -> Result<String, String> {
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(self)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| format!("Failed to serialize report: {e}")),
            ExportFormat::Yaml => {
                serde_yaml::to_string(self).map_err(|e| format!("Failed to serialize report: {e}"))
            }
        }
    }

    /// Writes the document to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, fs: &dyn FileSystem, path: &Path) -> Result<(), String> {
        let contents = self.render(ExportFormat::for_path(path))?;
        fs.write(path, &contents)
            .map_err(|e| format!("Failed to write report {}: {e}", path.display()))
    }
}
