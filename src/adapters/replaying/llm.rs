//! Replaying adapter for the `LlmClient` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};

/// Serves recorded completions.
pub struct ReplayingLlmClient {
    replayer: Option<Mutex<CassetteReplayer>>,
}

impl ReplayingLlmClient {
    /// Creates a client backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Some(Mutex::new(replayer)) }
    }

    /// Creates a client with no cassette; calling it panics.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl LlmClient for ReplayingLlmClient {
    fn complete(&self, _request: &CompletionRequest) -> CompletionFuture<'_> {
        let output = next_output(self.replayer.as_ref(), "llm", "complete");
        Box::pin(async move { replay_result::<CompletionResponse>(output) })
    }
}
