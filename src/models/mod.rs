//! Shared data models spanning the engine layers.

pub mod market;
pub mod position;
pub mod rules;

pub use market::{TickerSnapshot, Timeframe};
pub use position::{Completion, MessageHandle, NotificationRef, OpenPosition};
pub use rules::{Bound, RsiSnapshot, RuleSet, ThresholdRule};
