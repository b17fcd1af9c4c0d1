//! Environment configuration

use crate::error::ConfigError;
use crate::indicators::momentum::rsi::DEFAULT_RSI_PERIOD;
use crate::models::rules::{Bound, RuleSet};
use crate::core::scheduler::MAX_INTERVAL_SECONDS;
use crate::positions::tracker::{DEFAULT_COMPLETION_MAX_ATTEMPTS, DEFAULT_TARGET_MARKUP};
use crate::services::binance::DEFAULT_BINANCE_API_URL;
use crate::services::telegram::DEFAULT_TELEGRAM_API_URL;
use crate::signals::cooldown::DEFAULT_SIGNAL_COOLDOWN_MINUTES;
use chrono::Duration;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_QUOTE_ASSET: &str = "USDT";
pub const DEFAULT_REFERENCE_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_EVAL_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_WORKER_CONCURRENCY: usize = 8;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Binance serves at most 1000 klines per request and RSI needs `period + 1`
pub const MAX_RSI_PERIOD: usize = 999;

/// Deployment environment name (`ENVIRONMENT`), `sandbox` when unset
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub chat_ids: Vec<String>,
    pub telegram_api_url: String,
    pub binance_api_url: String,
    /// Tracked universe after exclusion and quote-asset filtering
    pub symbols: Vec<String>,
    pub rsi_period: usize,
    pub rules: RuleSet,
    pub target_markup: f64,
    pub cooldown: Duration,
    pub completion_max_attempts: u32,
    pub eval_interval_seconds: u64,
    pub concurrency: usize,
    pub http_timeout: std::time::Duration,
    pub reference_symbol: Option<String>,
    pub audit_log_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let chat_ids = split_list(
            &get("TELEGRAM_CHAT_IDS").ok_or(ConfigError::Missing("TELEGRAM_CHAT_IDS"))?,
        );
        if chat_ids.is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_CHAT_IDS"));
        }

        let tracked = get("TRACKED_PAIRS").ok_or(ConfigError::Missing("TRACKED_PAIRS"))?;
        let excluded = get("EXCLUDED_PAIRS").unwrap_or_default();
        let quote_asset = get("QUOTE_ASSET")
            .unwrap_or_else(|| DEFAULT_QUOTE_ASSET.to_string())
            .to_uppercase();
        let symbols = tracked_symbols(&split_list(&tracked), &split_list(&excluded), &quote_asset);
        if symbols.is_empty() {
            return Err(ConfigError::invalid(
                "TRACKED_PAIRS",
                &tracked,
                format!("no pairs left after exclusions and '{}' suffix filter", quote_asset),
            ));
        }

        let telegram_api_url = parse_url(
            "TELEGRAM_API_URL",
            get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        )?;
        let binance_api_url = parse_url(
            "BINANCE_API_URL",
            get("BINANCE_API_URL").unwrap_or_else(|| DEFAULT_BINANCE_API_URL.to_string()),
        )?;

        let rsi_period: usize = parse_or("RSI_PERIOD", get("RSI_PERIOD"), DEFAULT_RSI_PERIOD)?;
        if !(1..=MAX_RSI_PERIOD).contains(&rsi_period) {
            return Err(ConfigError::invalid(
                "RSI_PERIOD",
                &rsi_period.to_string(),
                format!("must be between 1 and {}", MAX_RSI_PERIOD),
            ));
        }

        let mut rules = match get("RSI_RULES") {
            Some(raw) => RuleSet::new(
                RuleSet::parse_rules(&raw).map_err(|e| ConfigError::invalid("RSI_RULES", &raw, e))?,
            ),
            None => RuleSet::default(),
        };
        if let Some(raw) = get("PRICE_CHANGE_RANGE") {
            let bound: Bound = raw
                .parse()
                .map_err(|e: String| ConfigError::invalid("PRICE_CHANGE_RANGE", &raw, e))?;
            rules = rules.with_price_change(bound);
        }

        let target_markup: f64 = parse_or("TARGET_MARKUP", get("TARGET_MARKUP"), DEFAULT_TARGET_MARKUP)?;
        if !(target_markup.is_finite() && target_markup > 1.0) {
            return Err(ConfigError::invalid(
                "TARGET_MARKUP",
                &target_markup.to_string(),
                "must be greater than 1",
            ));
        }

        let cooldown_minutes: i64 = parse_or(
            "SIGNAL_COOLDOWN_MINUTES",
            get("SIGNAL_COOLDOWN_MINUTES"),
            DEFAULT_SIGNAL_COOLDOWN_MINUTES,
        )?;
        if cooldown_minutes < 0 {
            return Err(ConfigError::invalid(
                "SIGNAL_COOLDOWN_MINUTES",
                &cooldown_minutes.to_string(),
                "must not be negative",
            ));
        }

        let completion_max_attempts: u32 = parse_or(
            "COMPLETION_MAX_ATTEMPTS",
            get("COMPLETION_MAX_ATTEMPTS"),
            DEFAULT_COMPLETION_MAX_ATTEMPTS,
        )?;
        let eval_interval_seconds: u64 = parse_or(
            "EVAL_INTERVAL_SECONDS",
            get("EVAL_INTERVAL_SECONDS"),
            DEFAULT_EVAL_INTERVAL_SECONDS,
        )?;
        if !(1..=MAX_INTERVAL_SECONDS).contains(&eval_interval_seconds) {
            return Err(ConfigError::invalid(
                "EVAL_INTERVAL_SECONDS",
                &eval_interval_seconds.to_string(),
                format!("must be between 1 and {}", MAX_INTERVAL_SECONDS),
            ));
        }
        let concurrency: usize = parse_or(
            "WORKER_CONCURRENCY",
            get("WORKER_CONCURRENCY"),
            DEFAULT_WORKER_CONCURRENCY,
        )?;
        let http_timeout_seconds: u64 = parse_or(
            "HTTP_TIMEOUT_SECONDS",
            get("HTTP_TIMEOUT_SECONDS"),
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?;

        // Explicitly blank disables the reference asset
        let reference_symbol = match lookup("REFERENCE_SYMBOL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_uppercase()),
            None => Some(DEFAULT_REFERENCE_SYMBOL.to_string()),
        };

        Ok(Self {
            telegram_token,
            chat_ids,
            telegram_api_url,
            binance_api_url,
            symbols,
            rsi_period,
            rules,
            target_markup,
            cooldown: Duration::minutes(cooldown_minutes),
            completion_max_attempts: completion_max_attempts.max(1),
            eval_interval_seconds,
            concurrency: concurrency.max(1),
            http_timeout: std::time::Duration::from_secs(http_timeout_seconds.max(1)),
            reference_symbol,
            audit_log_path: get("AUDIT_LOG_PATH").map(PathBuf::from),
        })
    }
}

/// Universe minus exclusions, restricted to pairs quoted in `quote_asset`.
/// Upper-cased, de-duplicated, first occurrence order kept.
pub fn tracked_symbols(tracked: &[String], excluded: &[String], quote_asset: &str) -> Vec<String> {
    let quote_asset = quote_asset.to_uppercase();
    let excluded: Vec<String> = excluded.iter().map(|s| s.to_uppercase()).collect();
    let mut symbols: Vec<String> = Vec::new();
    for symbol in tracked.iter().map(|s| s.to_uppercase()) {
        if excluded.contains(&symbol)
            || !symbol.ends_with(&quote_asset)
            || symbol.len() == quote_asset.len()
            || symbols.contains(&symbol)
        {
            continue;
        }
        symbols.push(symbol);
    }
    symbols
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn parse_url(key: &'static str, raw: String) -> Result<String, ConfigError> {
    let url = Url::parse(&raw).map_err(|e| ConfigError::invalid(key, &raw, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(key, &raw, "scheme must be http or https"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
