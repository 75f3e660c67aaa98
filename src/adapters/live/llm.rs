//! Live adapter for the `LlmClient` port using the Ollama chat API.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ports::llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};

/// Live LLM client that calls a local Ollama server.
pub struct OllamaLlmClient {
    client: Client,
    base_url: String,
}

impl OllamaLlmClient {
    /// Creates a client for the Ollama server at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into() }
    }
}

/// Request body sent to `/api/chat`.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

/// A single message in the chat request.
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Generation options.
#[derive(Serialize)]
struct ChatOptions {
    num_predict: u32,
}

/// Non-streaming response from `/api/chat`.
#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Error body returned by Ollama.
#[derive(Deserialize)]
struct OllamaError {
    error: String,
}

impl LlmClient for OllamaLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let model = request.model.clone();
        let system = request.system.clone();
        let prompt = request.prompt.clone();
        let max_tokens = request.max_tokens;
        let url = format!("{}/api/chat", self.base_url);

        Box::pin(async move {
            let body = ChatRequest {
                model: &model,
                messages: vec![
                    ChatMessage { role: "system", content: &system },
                    ChatMessage { role: "user", content: &prompt },
                ],
                stream: false,
                options: ChatOptions { num_predict: max_tokens },
            };

            let response = self.client.post(&url).json(&body).send().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Ollama chat request failed: {e}").into()
                },
            )?;

            let status = response.status();
            let response_text =
                response.text().await.map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Failed to read Ollama chat response: {e}").into()
                })?;

            if !status.is_success() {
                let msg = serde_json::from_str::<OllamaError>(&response_text)
                    .map(|e| e.error)
                    .unwrap_or(response_text);
                return Err(format!("Ollama chat error ({}): {msg}", status.as_u16()).into());
            }

            let chat: ChatResponse = serde_json::from_str(&response_text).map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Failed to parse Ollama chat response: {e}").into()
                },
            )?;

            Ok(CompletionResponse {
                text: chat.message.content,
                prompt_tokens: chat.prompt_eval_count,
                completion_tokens: chat.eval_count,
            })
        })
    }
}
