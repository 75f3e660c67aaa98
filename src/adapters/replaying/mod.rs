//! Replaying adapters that serve recorded interactions from cassettes.

pub mod clock;
pub mod embedder;
pub mod llm;

pub use clock::ReplayingClock;
pub use embedder::ReplayingEmbedder;
pub use llm::ReplayingLlmClient;

use std::error::Error;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Takes the next recorded output for `port`/`method`.
///
/// # Panics
///
/// Panics if the adapter has no cassette or the cassette is exhausted.
pub(crate) fn next_output(
    replayer: Option<&Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let Some(replayer) = replayer else {
        panic!("{port} port not configured in CassetteConfig: no cassette loaded for {port}");
    };
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.next_interaction(port, method).output.clone()
}

/// Decodes an `{"ok": v}` / `{"err": msg}` output.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: serde_json::Value,
) -> Result<T, Box<dyn Error + Send + Sync>> {
    if let Some(ok) = output.get("ok") {
        return serde_json::from_value(ok.clone())
            .map_err(|e| format!("cassette value does not decode: {e}").into());
    }
    match output.get("err").and_then(serde_json::Value::as_str) {
        Some(message) => Err(message.into()),
        None => Err(format!("cassette output is neither ok nor err: {output}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replay_result_decodes_both_arms() {
        let ok: Result<Vec<f32>, _> = replay_result(json!({"ok": [1.0, 2.0]}));
        assert_eq!(ok.unwrap(), vec![1.0, 2.0]);

        let err: Result<Vec<f32>, _> = replay_result(json!({"err": "offline"}));
        assert_eq!(err.unwrap_err().to_string(), "offline");

        let bad: Result<Vec<f32>, _> = replay_result(json!(42));
        assert!(bad.is_err());
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn missing_cassette_panics() {
        let _ = next_output(None, "llm", "complete");
    }
}
