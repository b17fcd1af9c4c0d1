//! Open-position state machine
//!
//! Each symbol is either absent or holds exactly one [`OpenPosition`]:
//!
//! - Absent -> Open: a signal fired, the symbol is not cooling down, and at
//!   least one opening alert was delivered.
//! - Open -> Open: every tick lowers `lowest_price` when a lower price is seen.
//! - Open -> Absent: the price reached the target and every completion edit
//!   was delivered, or completion delivery failed too many times.

use crate::models::position::{Completion, NotificationRef, OpenPosition};
use crate::models::rules::RsiSnapshot;
use crate::signals::cooldown::CooldownBook;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Default take-profit multiplier (+1.1%)
pub const DEFAULT_TARGET_MARKUP: f64 = 1.011;

/// Failed completion deliveries tolerated before a position is dropped
pub const DEFAULT_COMPLETION_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpenRejected {
    #[error("position already open for {0}")]
    AlreadyOpen(String),
    #[error("{0} is cooling down")]
    CoolingDown(String),
    #[error("no opening alert was delivered for {0}")]
    NotNotified(String),
    #[error("invalid entry price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
}

/// Data captured when a signal fires
#[derive(Debug, Clone)]
pub struct Entry {
    pub symbol: String,
    pub price: f64,
    pub time: DateTime<Utc>,
    pub rsi: RsiSnapshot,
    pub reference_price: Option<f64>,
}

/// Result of feeding a price into an open position
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Holding { lowest_price: f64 },
    TargetReached(Completion),
}

/// What happens after a completion alert could not be delivered
#[derive(Debug, Clone)]
pub enum CompletionRetry {
    Retry { attempts: u32 },
    Expired(OpenPosition),
}

pub struct PositionTracker {
    markup: f64,
    max_completion_attempts: u32,
    cooldowns: CooldownBook,
    positions: HashMap<String, OpenPosition>,
}

impl PositionTracker {
    pub fn new(markup: f64, cooldown: Duration) -> Self {
        Self {
            markup,
            max_completion_attempts: DEFAULT_COMPLETION_MAX_ATTEMPTS,
            cooldowns: CooldownBook::new(cooldown),
            positions: HashMap::new(),
        }
    }

    pub fn with_max_completion_attempts(mut self, attempts: u32) -> Self {
        self.max_completion_attempts = attempts.max(1);
        self
    }

    pub fn markup(&self) -> f64 {
        self.markup
    }

    pub fn target_for(&self, entry_price: f64) -> f64 {
        entry_price * self.markup
    }

    /// Whether a fresh signal for `symbol` may open a position at `now`
    pub fn check_open(&self, symbol: &str, now: DateTime<Utc>) -> Result<(), OpenRejected> {
        if self.positions.contains_key(symbol) {
            return Err(OpenRejected::AlreadyOpen(symbol.to_string()));
        }
        if self.cooldowns.is_cooling_down(symbol, now) {
            return Err(OpenRejected::CoolingDown(symbol.to_string()));
        }
        Ok(())
    }

    /// Open a position for a delivered signal and start its cooldown
    pub fn open(
        &mut self,
        entry: Entry,
        notifications: Vec<NotificationRef>,
    ) -> Result<&OpenPosition, OpenRejected> {
        self.check_open(&entry.symbol, entry.time)?;
        if !(entry.price.is_finite() && entry.price > 0.0) {
            return Err(OpenRejected::InvalidPrice {
                symbol: entry.symbol,
                price: entry.price,
            });
        }
        if notifications.is_empty() {
            return Err(OpenRejected::NotNotified(entry.symbol));
        }

        self.cooldowns.record(&entry.symbol, entry.time);
        let position = OpenPosition {
            symbol: entry.symbol.clone(),
            entry_price: entry.price,
            target_price: self.target_for(entry.price),
            entry_time: entry.time,
            lowest_price: entry.price,
            notifications,
            rsi_at_entry: entry.rsi,
            reference_price_at_entry: entry.reference_price,
            completion_attempts: 0,
            completion: None,
        };
        Ok(self.positions.entry(entry.symbol).or_insert(position))
    }

    /// Feed the latest price; `None` when no position is open for `symbol`.
    /// Once the target has been reached the recorded outcome is returned
    /// unchanged until the position is closed.
    pub fn observe(&mut self, symbol: &str, price: f64, now: DateTime<Utc>) -> Option<Observation> {
        let position = self.positions.get_mut(symbol)?;

        if let Some(completion) = &position.completion {
            return Some(Observation::TargetReached(completion.clone()));
        }

        if price < position.lowest_price {
            position.lowest_price = price;
        }

        if price >= position.target_price {
            let completion = Completion {
                symbol: position.symbol.clone(),
                entry_price: position.entry_price,
                target_price: position.target_price,
                exit_price: price,
                lowest_price: position.lowest_price,
                entry_time: position.entry_time,
                exit_time: now,
                drop_percent: position.drawdown_percent(),
                elapsed: now - position.entry_time,
            };
            position.completion = Some(completion.clone());
            return Some(Observation::TargetReached(completion));
        }

        Some(Observation::Holding {
            lowest_price: position.lowest_price,
        })
    }

    /// Outcome awaiting delivery, if the target was already reached
    pub fn pending_completion(&self, symbol: &str) -> Option<&Completion> {
        self.positions.get(symbol)?.completion.as_ref()
    }

    /// Forget a completion alert that reached `chat_id`, so retries only
    /// target the chats still missing it. Returns the remaining count.
    pub fn acknowledge_completion(&mut self, symbol: &str, chat_id: &str) -> usize {
        match self.positions.get_mut(symbol) {
            Some(position) => {
                position.notifications.retain(|n| n.chat_id != chat_id);
                position.notifications.len()
            }
            None => 0,
        }
    }

    /// Record a failed completion delivery; expires the position once the
    /// attempt limit is reached.
    pub fn completion_failed(&mut self, symbol: &str) -> Option<CompletionRetry> {
        let position = self.positions.get_mut(symbol)?;
        position.completion_attempts += 1;
        let attempts = position.completion_attempts;
        if attempts >= self.max_completion_attempts {
            return self.positions.remove(symbol).map(CompletionRetry::Expired);
        }
        Some(CompletionRetry::Retry { attempts })
    }

    pub fn close(&mut self, symbol: &str) -> Option<OpenPosition> {
        self.positions.remove(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&OpenPosition> {
        self.positions.get(symbol)
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Open symbols in stable order
    pub fn open_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.positions.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn cooldowns(&self) -> &CooldownBook {
        &self.cooldowns
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_MARKUP, CooldownBook::default().window())
    }
}
