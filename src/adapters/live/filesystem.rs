//! Live filesystem adapter using `std::fs`.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use crate::ports::filesystem::{DirEntry, EntryKind, FileSystem};

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

fn kind_of(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File { size: metadata.len() }
    } else {
        EntryKind::Other
    }
}

impl FileSystem for LiveFileSystem {
    fn entry_kind(&self, path: &Path) -> Result<EntryKind, Box<dyn std::error::Error + Send + Sync>> {
        Ok(kind_of(&std::fs::symlink_metadata(path)?))
    }

    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::canonicalize(path)?)
    }

    fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // DirEntry::metadata does not traverse symlinks.
            let kind = match entry.metadata() {
                Ok(metadata) => kind_of(&metadata),
                Err(e) => {
                    log::debug!("skipping unreadable entry {}: {e}", entry.path().display());
                    EntryKind::Other
                }
            };
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
