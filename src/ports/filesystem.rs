//! Filesystem port for directory traversal and document I/O.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// What a directory entry is, as seen without following symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntryKind {
    /// A regular file and its size in bytes.
    File {
        /// Size in bytes.
        size: u64,
    },
    /// A directory.
    Directory,
    /// A symbolic link, whether or not its target exists.
    Symlink,
    /// Anything else (sockets, fifos, devices).
    Other,
}

/// A single named entry inside a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// File name of the entry (no leading path).
    pub name: String,
    /// Entry type.
    pub kind: EntryKind,
}

/// Provides filesystem access for scanning trees and reading/writing documents.
pub trait FileSystem: Send + Sync {
    /// Describes the entry at `path` without following symbolic links.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or cannot be inspected.
    fn entry_kind(&self, path: &Path) -> Result<EntryKind, Box<dyn std::error::Error + Send + Sync>>;

    /// Resolves `path` to its canonical form, following symbolic links.
    ///
    /// Only the scan root is resolved this way; entries found during a walk
    /// are never followed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path or a link target does not exist.
    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<std::path::PathBuf, Box<dyn std::error::Error + Send + Sync>>;

    /// Lists the entries of a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a readable directory.
    fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>>;

    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}
