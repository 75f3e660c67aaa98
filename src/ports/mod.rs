//! Port traits defining external boundaries.
//!
//! Each trait is a boundary between the monitoring pipeline and an external
//! system (time, filesystem, text generation, embeddings). Implementations
//! live in `src/adapters/`.

pub mod clock;
pub mod embedder;
pub mod filesystem;
pub mod llm;

pub use clock::Clock;
pub use embedder::{Embedder, EmbeddingFuture, EmbeddingRequest};
pub use filesystem::{DirEntry, EntryKind, FileSystem};
pub use llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
