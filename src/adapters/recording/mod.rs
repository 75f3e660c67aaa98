//! Recording adapters that capture interactions to cassettes.
//!
//! Results are stored as `{"ok": value}` or `{"err": message}`, the same shape
//! [`crate::adapters::replaying`] reads back.

pub mod clock;
pub mod embedder;
pub mod llm;

pub use clock::RecordingClock;
pub use embedder::RecordingEmbedder;
pub use llm::RecordingLlmClient;

use std::sync::PoisonError;

use serde::Serialize;

use crate::cassette::session::SharedRecorder;

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::warn!("failed to serialize cassette value: {e}");
        serde_json::Value::Null
    })
}

/// Records a call whose return value cannot fail.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_json(input), to_json(output));
}

/// Records a fallible call.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::json!({ "ok": to_json(v) }),
        Err(e) => serde_json::json!({ "err": e.to_string() }),
    };
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_json(input), output);
}
