use chrono::{DateTime, Utc};

/// The timestamp boundary above which source rows are considered not yet seen.
///
/// Initialized to the current time at client construction, advanced only
/// after a row has been successfully mapped and emitted, and monotonic
/// non-decreasing. Never persisted: a restarted process polls from "now"
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Creates a watermark at the current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a watermark at an explicit point in time.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    /// Returns the current watermark value.
    pub fn get(&self) -> DateTime<Utc> {
        self.0
    }

    /// Advances the watermark to the maximum of its current value and
    /// `timestamp`. Returns whether the watermark moved.
    pub fn advance(&mut self, timestamp: DateTime<Utc>) -> bool {
        if timestamp > self.0 {
            self.0 = timestamp;
            true
        } else {
            false
        }
    }
}
