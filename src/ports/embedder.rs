//! Embedding port for turning text into fixed-dimension vectors.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by [`Embedder::embed`].
pub type EmbeddingFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<f32>, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// A request to embed a single text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The embedding model identifier (e.g. `"nomic-embed-text"`).
    pub model: String,
    /// Text to embed.
    pub text: String,
}

/// Produces embedding vectors for text.
pub trait Embedder: Send + Sync {
    /// Embeds the request text.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding backend is unreachable or replies with garbage.
    fn embed(&self, request: &EmbeddingRequest) -> EmbeddingFuture<'_>;
}
