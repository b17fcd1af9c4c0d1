//! Binance spot REST client for public market data

use crate::error::MarketDataError;
use crate::models::market::{TickerSnapshot, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BINANCE_API_URL: &str = "https://api.binance.com";

/// Close price position inside a kline array
const KLINE_CLOSE_INDEX: usize = 4;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    price_change_percent: String,
}

pub struct BinanceRestClient {
    base_url: String,
    client: Client,
}

impl BinanceRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/v3/klines`, returning close prices oldest first
    pub async fn klines_closes(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: usize,
    ) -> Result<Vec<f64>, MarketDataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows: Vec<Vec<Value>> = Self::decode(response).await?;
        debug!(symbol = %symbol, interval = %interval, count = rows.len(), "Binance: fetched klines");

        rows.iter()
            .map(|row| {
                row.get(KLINE_CLOSE_INDEX)
                    .ok_or_else(|| {
                        MarketDataError::Malformed(format!("kline row has {} fields", row.len()))
                    })
                    .and_then(parse_decimal)
            })
            .collect()
    }

    /// `GET /api/v3/ticker/24hr`
    pub async fn ticker_24h(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let ticker: Ticker24h = Self::decode(response).await?;
        Ok(TickerSnapshot {
            last_price: parse_decimal_str(&ticker.last_price)?,
            price_change_percent: parse_decimal_str(&ticker.price_change_percent)?,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MarketDataError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| MarketDataError::Malformed(e.to_string()))
    }
}

/// Binance encodes prices as decimal strings; plain numbers are accepted too
fn parse_decimal(value: &Value) -> Result<f64, MarketDataError> {
    match value {
        Value::String(s) => parse_decimal_str(s),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| MarketDataError::Malformed(format!("unrepresentable number {}", n))),
        other => Err(MarketDataError::Malformed(format!(
            "expected decimal, got {}",
            other
        ))),
    }
}

fn parse_decimal_str(s: &str) -> Result<f64, MarketDataError> {
    let value: f64 = s
        .parse()
        .map_err(|e| MarketDataError::Malformed(format!("invalid decimal '{}': {}", s, e)))?;
    if !value.is_finite() {
        return Err(MarketDataError::Malformed(format!("non-finite decimal '{}'", s)));
    }
    Ok(value)
}
