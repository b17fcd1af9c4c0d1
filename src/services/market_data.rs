//! Market data provider interface.

use crate::error::MarketDataError;
use crate::models::market::{TickerSnapshot, Timeframe};

#[async_trait::async_trait]
pub trait MarketDataProvider {
    /// Get the last `limit` closing prices for a symbol, oldest first
    async fn get_closing_prices(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<f64>, MarketDataError>;

    /// Get the 24h ticker snapshot for a symbol
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError>;

    /// Get the latest traded price for a symbol
    async fn get_latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        Ok(self.get_ticker(symbol).await?.last_price)
    }
}
