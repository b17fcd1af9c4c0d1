//! Binance market data provider with retry

use crate::error::MarketDataError;
use crate::models::market::{TickerSnapshot, Timeframe};
use crate::services::market_data::MarketDataProvider;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

use super::client::BinanceRestClient;

const MAX_RETRIES: usize = 3;

pub struct BinanceMarketDataProvider {
    client: BinanceRestClient,
    backoff: ExponentialBuilder,
}

impl BinanceMarketDataProvider {
    pub fn new(client: BinanceRestClient) -> Self {
        Self::with_backoff(
            client,
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(250))
                .with_max_delay(Duration::from_secs(4))
                .with_max_times(MAX_RETRIES),
        )
    }

    pub fn with_backoff(client: BinanceRestClient, backoff: ExponentialBuilder) -> Self {
        Self { client, backoff }
    }

    pub fn client(&self) -> &BinanceRestClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for BinanceMarketDataProvider {
    async fn get_closing_prices(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<f64>, MarketDataError> {
        (|| async move { self.client.klines_closes(symbol, timeframe, limit).await })
            .retry(self.backoff.clone())
            .when(MarketDataError::is_transient)
            .notify(|err: &MarketDataError, delay: Duration| {
                warn!(
                    symbol = %symbol,
                    timeframe = %timeframe,
                    error = %err,
                    "Binance: klines request failed, retrying in {:?}",
                    delay
                );
            })
            .await
    }

    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError> {
        (|| async move { self.client.ticker_24h(symbol).await })
            .retry(self.backoff.clone())
            .when(MarketDataError::is_transient)
            .notify(|err: &MarketDataError, delay: Duration| {
                warn!(
                    symbol = %symbol,
                    error = %err,
                    "Binance: ticker request failed, retrying in {:?}",
                    delay
                );
            })
            .await
    }
}
