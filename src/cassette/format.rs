//! Cassette data structures for recording and replaying interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call to a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording (assigned by the recorder).
    pub seq: u64,
    /// Port name (`"clock"`, `"llm"`, `"embedder"`).
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Request sent to the port.
    pub input: serde_json::Value,
    /// What the port returned.
    pub output: serde_json::Value,
}

/// A named, ordered list of interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Version of tidyscan that produced the recording.
    pub version: String,
    /// Recorded interactions in call order.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Parses a cassette from YAML.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the document is not a cassette.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }
}
