//! Hypothetical position tracking from signal to target.

pub mod tracker;

pub use tracker::{
    CompletionRetry, Entry, Observation, OpenRejected, PositionTracker,
    DEFAULT_COMPLETION_MAX_ATTEMPTS, DEFAULT_TARGET_MARKUP,
};
