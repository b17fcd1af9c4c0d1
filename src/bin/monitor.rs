//! RSI Watch Monitor
//!
//! Polls Binance on a fixed interval, emits multi-timeframe RSI buy signals
//! to Telegram and follows each hypothetical position until its target.
//! Open positions live in memory only and are lost on restart.

use dotenvy::dotenv;
use rsi_watch::audit::AuditLog;
use rsi_watch::config::{get_environment, Config};
use rsi_watch::core::runtime::{MonitorRuntime, RuntimeConfig};
use rsi_watch::core::scheduler::CycleScheduler;
use rsi_watch::logging;
use rsi_watch::positions::PositionTracker;
use rsi_watch::services::binance::{BinanceMarketDataProvider, BinanceRestClient};
use rsi_watch::services::market_data::MarketDataProvider;
use rsi_watch::services::notifier::Notifier;
use rsi_watch::services::telegram::TelegramNotifier;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let env = get_environment();
    info!("Starting RSI Watch Monitor");
    info!(environment = %env, "Environment");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(format!("configuration error: {}", e).into());
        }
    };

    info!(
        symbol_count = config.symbols.len(),
        "Monitoring pairs: {}",
        config.symbols.join(", ")
    );
    info!(
        rules = ?config.rules,
        rsi_period = config.rsi_period,
        markup = config.target_markup,
        cooldown_minutes = config.cooldown.num_minutes(),
        chats = config.chat_ids.len(),
        "Signal configuration"
    );

    let rest_client = BinanceRestClient::new(config.binance_api_url.clone(), config.http_timeout)?;
    let market_data: Arc<dyn MarketDataProvider + Send + Sync> =
        Arc::new(BinanceMarketDataProvider::new(rest_client));

    let notifier: Arc<dyn Notifier + Send + Sync> = Arc::new(TelegramNotifier::new(
        config.telegram_api_url.clone(),
        config.telegram_token.clone(),
        config.http_timeout,
    )?);

    let tracker = PositionTracker::new(config.target_markup, config.cooldown)
        .with_max_completion_attempts(config.completion_max_attempts);

    let mut runtime = MonitorRuntime::new(
        RuntimeConfig::from(&config),
        market_data,
        notifier,
        tracker,
    );

    if let Some(path) = &config.audit_log_path {
        match AuditLog::open(path) {
            Ok(audit) => {
                info!(path = %path.display(), "Audit log enabled");
                runtime = runtime.with_audit_log(audit);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open audit log, continuing without it");
            }
        }
    }

    let scheduler = CycleScheduler::new(config.eval_interval_seconds)?;
    scheduler.start(runtime).await?;

    info!("Monitor started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down monitor...");
    scheduler.stop().await;
    info!("Monitor stopped");

    Ok(())
}
