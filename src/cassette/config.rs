//! Per-port cassette selection for replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Cassette file for each replayable port. Unset ports fail loudly when called.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Cassette for the text-generation port.
    pub llm: Option<PathBuf>,
    /// Cassette for the embedding port.
    pub embedder: Option<PathBuf>,
    /// Cassette for the clock port.
    pub clock: Option<PathBuf>,
}

/// Replayers loaded from a [`CassetteConfig`].
pub struct PortReplayers {
    /// Replayer for the text-generation port.
    pub llm: Option<CassetteReplayer>,
    /// Replayer for the embedding port.
    pub embedder: Option<CassetteReplayer>,
    /// Replayer for the clock port.
    pub clock: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Points every port at the cassettes a recording session wrote into `dir`.
    #[must_use]
    pub fn from_session_dir(dir: &Path) -> Self {
        let existing = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self { llm: existing("llm"), embedder: existing("embedder"), clock: existing("clock") }
    }

    /// Loads one cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<CassetteReplayer, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette = Cassette::from_yaml(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(CassetteReplayer::new(&cassette))
    }

    /// Loads every configured cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            llm: self.llm.as_deref().map(Self::load).transpose()?,
            embedder: self.embedder.as_deref().map(Self::load).transpose()?,
            clock: self.clock.as_deref().map(Self::load).transpose()?,
        })
    }
}
