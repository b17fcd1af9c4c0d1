//! Integration tests for the Binance market data gateway

use backon::ExponentialBuilder;
use rsi_watch::error::MarketDataError;
use rsi_watch::models::market::Timeframe;
use rsi_watch::services::binance::{BinanceMarketDataProvider, BinanceRestClient};
use rsi_watch::services::market_data::MarketDataProvider;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> BinanceMarketDataProvider {
    let client = BinanceRestClient::with_client(server.uri(), reqwest::Client::new());
    BinanceMarketDataProvider::with_backoff(
        client,
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_max_times(2),
    )
}

fn kline(open_time: i64, close: &str) -> serde_json::Value {
    serde_json::json!([
        open_time,
        "100.00",
        "110.00",
        "90.00",
        close,
        "12.5",
        open_time + 59_999,
        "1250.0",
        42,
        "6.0",
        "600.0",
        "0"
    ])
}

#[tokio::test]
async fn klines_are_parsed_into_closes_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("symbol", "ETHUSDT"))
        .and(query_param("interval", "4h"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            kline(0, "101.5"),
            kline(60_000, "99.25"),
            kline(120_000, "100.00000000")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let closes = provider(&server)
        .get_closing_prices("ETHUSDT", Timeframe::H4, 3)
        .await
        .unwrap();

    assert_eq!(closes, vec![101.5, 99.25, 100.0]);
}

#[tokio::test]
async fn ticker_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "symbol": "BTCUSDT",
            "priceChange": "-1200.00",
            "priceChangePercent": "-1.812",
            "lastPrice": "65000.01",
            "volume": "12345.6"
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let ticker = provider.get_ticker("BTCUSDT").await.unwrap();
    assert_eq!(ticker.last_price, 65000.01);
    assert_eq!(ticker.price_change_percent, -1.812);

    let latest = provider.get_latest_price("BTCUSDT").await.unwrap();
    assert_eq!(latest, 65000.01);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"code":-1121,"msg":"Invalid symbol."}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .get_closing_prices("NOPEUSDT", Timeframe::M1, 15)
        .await
        .unwrap_err();

    match err {
        MarketDataError::Api { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid symbol"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = provider(&server).get_ticker("ETHUSDT").await.unwrap_err();

    assert!(matches!(err, MarketDataError::Api { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0, "1.0"]])))
        .mount(&server)
        .await;

    let err = provider(&server)
        .get_closing_prices("ETHUSDT", Timeframe::M1, 15)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketDataError::Malformed(_)));
    assert!(!err.is_transient());
}
