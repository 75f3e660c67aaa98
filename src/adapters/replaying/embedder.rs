//! Replaying adapter for the `Embedder` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{Embedder, EmbeddingFuture, EmbeddingRequest};

/// Serves recorded embedding vectors.
pub struct ReplayingEmbedder {
    replayer: Option<Mutex<CassetteReplayer>>,
}

impl ReplayingEmbedder {
    /// Creates an embedder backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Some(Mutex::new(replayer)) }
    }

    /// Creates an embedder with no cassette; calling it panics.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl Embedder for ReplayingEmbedder {
    fn embed(&self, _request: &EmbeddingRequest) -> EmbeddingFuture<'_> {
        let output = next_output(self.replayer.as_ref(), "embedder", "embed");
        Box::pin(async move { replay_result::<Vec<f32>>(output) })
    }
}
