//! Per-symbol signal cooldown

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Default minimum spacing between two signals for the same symbol
pub const DEFAULT_SIGNAL_COOLDOWN_MINUTES: i64 = 30;

/// Last signal time per symbol. Entries are never pruned; an entry older than
/// the window simply stops suppressing.
#[derive(Debug, Clone)]
pub struct CooldownBook {
    window: Duration,
    last_signal: HashMap<String, DateTime<Utc>>,
}

impl CooldownBook {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_signal: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Suppressed while less than the window has elapsed since the last signal
    pub fn is_cooling_down(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.last_signal
            .get(symbol)
            .is_some_and(|last| now - *last < self.window)
    }

    pub fn record(&mut self, symbol: &str, now: DateTime<Utc>) {
        self.last_signal.insert(symbol.to_string(), now);
    }

    pub fn last_signal(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.last_signal.get(symbol).copied()
    }
}

impl Default for CooldownBook {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_SIGNAL_COOLDOWN_MINUTES))
    }
}
