//! Live clock using the system clock.

use chrono::{DateTime, SubsecRound, Utc};

use crate::ports::clock::Clock;

/// Live clock that returns the real current time.
///
/// Readings are truncated to microseconds, the resolution history is ordered
/// by, so a stamp survives a round trip through the store unchanged.
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
