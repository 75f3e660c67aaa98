//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::live::{LiveClock, LiveFileSystem, OllamaEmbedder, OllamaLlmClient};
use crate::adapters::recording::{RecordingClock, RecordingEmbedder, RecordingLlmClient};
use crate::adapters::replaying::{ReplayingClock, ReplayingEmbedder, ReplayingLlmClient};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::Settings;
use crate::ports::{Clock, Embedder, FileSystem, LlmClient};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, replaying).
pub struct ServiceContext {
    /// Clock used to stamp snapshots.
    pub clock: Box<dyn Clock>,
    /// Filesystem that is scanned and that documents are written to.
    pub fs: Box<dyn FileSystem>,
    /// Text-generation model for report narratives.
    pub llm: Box<dyn LlmClient>,
    /// Embedding model for the similarity index.
    pub embedder: Box<dyn Embedder>,
}

impl ServiceContext {
    /// Assembles a context from explicit adapters.
    #[must_use]
    pub fn from_parts(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        llm: Box<dyn LlmClient>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self { clock, fs, llm, embedder }
    }

    /// Creates a live context talking to the Ollama server in `settings`.
    #[must_use]
    pub fn live(settings: &Settings) -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(OllamaLlmClient::new(settings.ollama_url.clone())),
            embedder: Box::new(OllamaEmbedder::new(settings.ollama_url.clone())),
        }
    }

    /// Creates a live context whose clock, model, and embedder calls are
    /// captured by `session`.
    ///
    /// The filesystem is not recorded; replays run against the same tree.
    #[must_use]
    pub fn recording(settings: &Settings, session: &RecordingSession) -> Self {
        let live = Self::live(settings);
        Self {
            clock: Box::new(RecordingClock::new(live.clock, session.clock.clone())),
            fs: live.fs,
            llm: Box::new(RecordingLlmClient::new(live.llm, session.llm.clone())),
            embedder: Box::new(RecordingEmbedder::new(live.embedder, session.embedder.clone())),
        }
    }

    /// Creates a replaying context from the cassettes in a session directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette in the directory cannot be read or parsed.
    pub fn replaying(session_dir: &Path) -> Result<Self, String> {
        Self::replaying_from(&CassetteConfig::from_session_dir(session_dir))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a cassette panic with a clear message when called. The
    /// filesystem is always live.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            clock: Box::new(replayers.clock.map_or_else(ReplayingClock::unconfigured, ReplayingClock::new)),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(
                replayers.llm.map_or_else(ReplayingLlmClient::unconfigured, ReplayingLlmClient::new),
            ),
            embedder: Box::new(
                replayers.embedder.map_or_else(ReplayingEmbedder::unconfigured, ReplayingEmbedder::new),
            ),
        })
    }
}
