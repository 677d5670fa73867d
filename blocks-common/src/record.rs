use std::fmt;

use serde::{Deserialize, Serialize};

/// A single entry of the provider's blocked address report.
///
/// Only `created` and `email` are mandatory, the provider omits the other
/// fields for some bounce classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Seconds since the Unix epoch at which the block was recorded.
    pub created: i64,
    pub email: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub status: String,
}

/// The watermark of the poll loop: one past the highest `created` value processed so far.
///
/// The provider query is inclusive (`created >= start_time`), so the checkpoint always
/// points at the first second that has not been fully processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(i64);

impl Checkpoint {
    pub fn new(timestamp: i64) -> Self {
        Self(timestamp)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Move the watermark past `created` if the record is at or beyond it.
    /// Returns `true` when the checkpoint moved, and never moves it backwards.
    pub fn advance_past(&mut self, created: i64) -> bool {
        if created < self.0 {
            return false;
        }

        let next = created.saturating_add(1);
        if next > self.0 {
            self.0 = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pick the checkpoint to start from.
///
/// A stored value always wins over an older configured one, a negative value on either side
/// means "not set", and when nothing is set we start from `now`.
pub fn resolve_initial_checkpoint(stored: Option<i64>, configured: i64, now: i64) -> Checkpoint {
    let stored = stored.filter(|timestamp| *timestamp >= 0);
    let configured = Some(configured).filter(|timestamp| *timestamp >= 0);

    let timestamp = match (stored, configured) {
        (Some(stored), Some(configured)) => stored.max(configured),
        (Some(stored), None) => stored,
        (None, Some(configured)) => configured,
        (None, None) => now,
    };

    Checkpoint::new(timestamp)
}
