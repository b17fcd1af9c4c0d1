//! RSI watch: multi-timeframe RSI signal monitor with hypothetical
//! take-profit tracking and Telegram alerts.

pub mod audit;
pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod positions;
pub mod services;
pub mod signals;

pub use config::Config;
pub use error::{AuditError, ConfigError, MarketDataError, NotifyError};
