//! Binance spot market data

pub mod client;
pub mod provider;

pub use client::{BinanceRestClient, DEFAULT_BINANCE_API_URL};
pub use provider::BinanceMarketDataProvider;
