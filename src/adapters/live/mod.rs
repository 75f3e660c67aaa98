//! Live adapters for real external interactions.

pub mod clock;
pub mod embedder;
pub mod filesystem;
pub mod llm;

pub use clock::LiveClock;
pub use embedder::OllamaEmbedder;
pub use filesystem::LiveFileSystem;
pub use llm::OllamaLlmClient;
