//! Live adapter for the `Embedder` port using the Ollama embed API.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ports::embedder::{Embedder, EmbeddingFuture, EmbeddingRequest};

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
}

impl OllamaEmbedder {
    /// Creates an embedder for the Ollama server at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into() }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, request: &EmbeddingRequest) -> EmbeddingFuture<'_> {
        let model = request.model.clone();
        let text = request.text.clone();
        let url = format!("{}/api/embed", self.base_url);

        Box::pin(async move {
            let body = EmbedRequest { model: &model, input: vec![&text] };
            let response = self.client.post(&url).json(&body).send().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Ollama embed request failed: {e}").into()
                },
            )?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(format!("Ollama embed error ({}): {body}", status.as_u16()).into());
            }

            let parsed: EmbedResponse = response.json().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Failed to parse Ollama embed response: {e}").into()
                },
            )?;

            parsed
                .embeddings
                .into_iter()
                .next()
                .ok_or_else(|| Box::<dyn std::error::Error + Send + Sync>::from("Ollama returned no embeddings"))
        })
    }
}
