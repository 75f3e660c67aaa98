//! Recording session: one cassette recorder per recorded port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Shared handle to a port's recorder.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Per-port recorders writing into a timestamped directory.
pub struct RecordingSession {
    /// Recorder for text-generation calls.
    pub llm: SharedRecorder,
    /// Recorder for embedding calls.
    pub embedder: SharedRecorder,
    /// Recorder for clock reads.
    pub clock: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Starts a session under `base_dir/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new(base_dir: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let output_dir = base_dir.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let make_recorder = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(
                path,
                format!("{timestamp}-{port}"),
                env!("CARGO_PKG_VERSION"),
            )))
        };

        Ok(Self {
            llm: make_recorder("llm"),
            embedder: make_recorder("embedder"),
            clock: make_recorder("clock"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every cassette and returns the session directory.
    ///
    /// All recording adapters must have been dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter still holds a recorder or a file cannot
    /// be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: SharedRecorder, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.llm, "llm")?;
        finish_one(self.embedder, "embedder")?;
        finish_one(self.clock, "clock")?;
        Ok(self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_writes_one_cassette_per_port() {
        let base = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(base.path()).unwrap();
        assert!(session.output_dir().starts_with(base.path()));

        let dir = session.finish().unwrap();
        for port in ["llm", "embedder", "clock"] {
            assert!(dir.join(format!("{port}.cassette.yaml")).exists());
        }
    }

    #[test]
    fn finish_fails_while_adapter_holds_recorder() {
        let base = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(base.path()).unwrap();
        let _held = Arc::clone(&session.clock);
        assert!(session.finish().unwrap_err().contains("clock"));
    }
}
