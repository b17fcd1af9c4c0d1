pub mod rsi;

pub use rsi::{calculate_rsi, calculate_rsi_default, DEFAULT_RSI_PERIOD};
