//! Replaying adapter for the Clock port.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::clock::Clock;

/// Serves recorded clock readings.
pub struct ReplayingClock {
    replayer: Option<Mutex<CassetteReplayer>>,
}

impl ReplayingClock {
    /// Creates a clock backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Some(Mutex::new(replayer)) }
    }

    /// Creates a clock with no cassette; reading it panics.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl Clock for ReplayingClock {
    fn now(&self) -> DateTime<Utc> {
        let output = next_output(self.replayer.as_ref(), "clock", "now");
        match serde_json::from_value(output) {
            Ok(time) => time,
            Err(e) => panic!("clock::now: recorded value is not a timestamp: {e}"),
        }
    }
}
