//! Signal evaluation interfaces.

pub mod cooldown;
pub mod evaluator;

pub use cooldown::{CooldownBook, DEFAULT_SIGNAL_COOLDOWN_MINUTES};
pub use evaluator::SignalEvaluator;
