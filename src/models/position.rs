//! Hypothetical position models

use crate::models::rules::RsiSnapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque id of a sent message, needed to edit it later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub i64);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One delivered opening alert: which chat, which message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRef {
    pub chat_id: String,
    pub handle: MessageHandle,
}

/// A hypothetical long position waiting for its target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub entry_price: f64,
    pub target_price: f64,
    pub entry_time: DateTime<Utc>,
    pub lowest_price: f64,
    pub notifications: Vec<NotificationRef>,
    pub rsi_at_entry: RsiSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price_at_entry: Option<f64>,
    /// Completion edits that failed so far
    pub completion_attempts: u32,
    /// Set once the target is reached; retries resend exactly this outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
}

impl OpenPosition {
    /// Drop from entry to the lowest observed price, in percent (zero or negative)
    pub fn drawdown_percent(&self) -> f64 {
        (self.lowest_price - self.entry_price) / self.entry_price * 100.0
    }
}

/// Outcome of a position whose target was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub symbol: String,
    pub entry_price: f64,
    pub target_price: f64,
    pub exit_price: f64,
    pub lowest_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub drop_percent: f64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl Completion {
    /// Elapsed time split into whole hours, minutes and seconds (truncated)
    pub fn elapsed_hms(&self) -> (i64, i64, i64) {
        split_hms(self.elapsed)
    }
}

pub fn split_hms(elapsed: Duration) -> (i64, i64, i64) {
    let total = elapsed.num_seconds().max(0);
    (total / 3600, (total % 3600) / 60, total % 60)
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(d)?))
    }
}
