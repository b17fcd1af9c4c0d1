//! One evaluation cycle: signal scan over the tracked universe, then a
//! position scan over every open position.

use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::MarketDataError;
use crate::indicators::momentum::rsi::{calculate_rsi, DEFAULT_RSI_PERIOD};
use crate::models::position::{Completion, NotificationRef};
use crate::models::rules::{RsiSnapshot, RuleSet};
use crate::positions::tracker::{CompletionRetry, Entry, Observation, OpenRejected, PositionTracker};
use crate::services::market_data::MarketDataProvider;
use crate::services::notifier::Notifier;
use crate::services::telegram::format::{render_completion, render_signal, ReferenceContext};
use crate::signals::evaluator::SignalEvaluator;
use chrono::{DateTime, Utc};
use futures_util::future::{join_all, BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the evaluation cycle
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub symbols: Vec<String>,
    pub chat_ids: Vec<String>,
    pub rules: RuleSet,
    pub rsi_period: usize,
    pub concurrency: usize,
    pub reference_symbol: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string()],
            chat_ids: Vec::new(),
            rules: RuleSet::default(),
            rsi_period: DEFAULT_RSI_PERIOD,
            concurrency: 8,
            reference_symbol: None,
        }
    }
}

impl From<&Config> for RuntimeConfig {
    fn from(config: &Config) -> Self {
        Self {
            symbols: config.symbols.clone(),
            chat_ids: config.chat_ids.clone(),
            rules: config.rules.clone(),
            rsi_period: config.rsi_period,
            concurrency: config.concurrency,
            reference_symbol: config.reference_symbol.clone(),
        }
    }
}

/// Counters for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub scanned: usize,
    pub fetch_failures: usize,
    pub signals: usize,
    pub suppressed: usize,
    pub notify_failures: usize,
    pub opened: usize,
    pub closed: usize,
    pub expired: usize,
    pub open_positions: usize,
}

/// Indicator readings for one symbol in one cycle
#[derive(Debug, Clone)]
struct SymbolScan {
    rsi: RsiSnapshot,
    last_close: Option<f64>,
    price_change_percent: Option<f64>,
}

/// Reference-asset price, fetched at most once per cycle
#[derive(Default)]
struct ReferenceCache(Option<Option<f64>>);

pub struct MonitorRuntime {
    config: RuntimeConfig,
    market_data: Arc<dyn MarketDataProvider + Send + Sync>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    tracker: PositionTracker,
    audit: Option<AuditLog>,
}

impl MonitorRuntime {
    pub fn new(
        config: RuntimeConfig,
        market_data: Arc<dyn MarketDataProvider + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        tracker: PositionTracker,
    ) -> Self {
        Self {
            config,
            market_data,
            notifier,
            tracker,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run both passes as of `now`. Never fails: per-symbol errors are logged
    /// and counted.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let mut reference = ReferenceCache::default();

        self.signal_scan(now, &mut reference, &mut report).await;
        self.position_scan(now, &mut reference, &mut report).await;

        report.open_positions = self.tracker.len();
        info!(
            scanned = report.scanned,
            signals = report.signals,
            opened = report.opened,
            closed = report.closed,
            open_positions = report.open_positions,
            fetch_failures = report.fetch_failures,
            "MonitorRuntime: cycle complete"
        );
        report
    }

    async fn signal_scan(
        &mut self,
        now: DateTime<Utc>,
        reference: &mut ReferenceCache,
        report: &mut CycleReport,
    ) {
        let concurrency = self.config.concurrency.max(1);
        let scans: Vec<(String, Result<SymbolScan, MarketDataError>)> = {
            let this = &*self;
            let fetches: Vec<BoxFuture<'_, (String, Result<SymbolScan, MarketDataError>)>> = this
                .config
                .symbols
                .iter()
                .map(|symbol| {
                    async move { (symbol.clone(), this.scan_symbol(symbol).await) }.boxed()
                })
                .collect();
            stream::iter(fetches).buffered(concurrency).collect().await
        };

        for (symbol, result) in scans {
            report.scanned += 1;
            let scan = match result {
                Ok(scan) => scan,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "MonitorRuntime: market data fetch failed, skipping");
                    report.fetch_failures += 1;
                    continue;
                }
            };

            debug!(symbol = %symbol, rsi = %scan.rsi, "MonitorRuntime: RSI computed");

            if !SignalEvaluator::evaluate(&self.config.rules, &scan.rsi, scan.price_change_percent) {
                continue;
            }
            report.signals += 1;

            if let Err(reason) = self.tracker.check_open(&symbol, now) {
                debug!(symbol = %symbol, reason = %reason, "MonitorRuntime: signal suppressed");
                report.suppressed += 1;
                continue;
            }

            let Some(price) = scan.last_close else {
                warn!(symbol = %symbol, "MonitorRuntime: signal without a closing price");
                continue;
            };

            let entry = Entry {
                symbol: symbol.clone(),
                price,
                time: now,
                rsi: scan.rsi,
                reference_price: self.reference_price(reference).await,
            };
            self.open_position(entry, scan.price_change_percent, report).await;
        }
    }

    async fn scan_symbol(&self, symbol: &str) -> Result<SymbolScan, MarketDataError> {
        let period = self.config.rsi_period;
        let fastest = self.config.rules.fastest_timeframe();
        let mut rsi = RsiSnapshot::new();
        let mut last_close = None;

        for timeframe in self.config.rules.timeframes() {
            let closes = self
                .market_data
                .get_closing_prices(symbol, timeframe, period + 1)
                .await?;
            rsi.insert(timeframe, calculate_rsi(&closes, period));
            if Some(timeframe) == fastest {
                last_close = closes.last().copied();
            }
        }

        let price_change_percent = match self.config.rules.price_change {
            Some(_) => Some(self.market_data.get_ticker(symbol).await?.price_change_percent),
            None => None,
        };

        Ok(SymbolScan {
            rsi,
            last_close,
            price_change_percent,
        })
    }

    async fn open_position(
        &mut self,
        entry: Entry,
        price_change_percent: Option<f64>,
        report: &mut CycleReport,
    ) {
        let target = self.tracker.target_for(entry.price);
        let text = render_signal(
            &entry,
            target,
            price_change_percent,
            self.reference_context(entry.reference_price, None),
        );

        let notifier = &self.notifier;
        let deliveries = join_all(self.config.chat_ids.iter().map(|chat_id| {
            let text = &text;
            async move { (chat_id.clone(), notifier.send(chat_id, text).await) }
        }))
        .await;

        let mut delivered = Vec::new();
        for (chat_id, result) in deliveries {
            match result {
                Ok(handle) => delivered.push(NotificationRef { chat_id, handle }),
                Err(e) => {
                    error!(symbol = %entry.symbol, chat_id = %chat_id, error = %e, "MonitorRuntime: failed to send signal alert");
                }
            }
        }

        if delivered.is_empty() {
            report.notify_failures += 1;
            warn!(symbol = %entry.symbol, "MonitorRuntime: no alert delivered, position not opened");
            return;
        }

        match self.tracker.open(entry.clone(), delivered) {
            Ok(position) => {
                info!(
                    symbol = %position.symbol,
                    entry_price = position.entry_price,
                    target_price = position.target_price,
                    rsi = %position.rsi_at_entry,
                    "MonitorRuntime: buy signal, position opened"
                );
                report.opened += 1;
            }
            Err(OpenRejected::AlreadyOpen(symbol)) | Err(OpenRejected::CoolingDown(symbol)) => {
                debug!(symbol = %symbol, "MonitorRuntime: position not opened");
                return;
            }
            Err(e) => {
                error!(symbol = %entry.symbol, error = %e, "MonitorRuntime: position not opened");
                return;
            }
        }

        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = audit.record_signal(&entry) {
                warn!(symbol = %entry.symbol, error = %e, "MonitorRuntime: audit write failed");
            }
        }
    }

    async fn position_scan(
        &mut self,
        now: DateTime<Utc>,
        reference: &mut ReferenceCache,
        report: &mut CycleReport,
    ) {
        let (pending, watching): (Vec<String>, Vec<String>) = self
            .tracker
            .open_symbols()
            .into_iter()
            .partition(|symbol| self.tracker.pending_completion(symbol).is_some());

        // Completions whose delivery failed earlier are retried without a new price
        for symbol in pending {
            let completion = self.tracker.pending_completion(&symbol).cloned();
            if let Some(completion) = completion {
                self.complete_position(completion, reference, report).await;
            }
        }

        let concurrency = self.config.concurrency.max(1);
        let prices: Vec<(String, Result<f64, MarketDataError>)> = {
            let market_data = &self.market_data;
            let fetches: Vec<BoxFuture<'_, (String, Result<f64, MarketDataError>)>> = watching
                .into_iter()
                .map(|symbol| {
                    async move {
                        let price = market_data.get_latest_price(&symbol).await;
                        (symbol, price)
                    }
                    .boxed()
                })
                .collect();
            stream::iter(fetches).buffered(concurrency).collect().await
        };

        for (symbol, result) in prices {
            let price = match result {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "MonitorRuntime: price fetch failed for open position");
                    report.fetch_failures += 1;
                    continue;
                }
            };

            match self.tracker.observe(&symbol, price, now) {
                Some(Observation::Holding { lowest_price }) => {
                    debug!(symbol = %symbol, price = price, lowest_price = lowest_price, "MonitorRuntime: position holding");
                }
                Some(Observation::TargetReached(completion)) => {
                    self.complete_position(completion, reference, report).await;
                }
                None => {}
            }
        }
    }

    async fn complete_position(
        &mut self,
        completion: Completion,
        reference: &mut ReferenceCache,
        report: &mut CycleReport,
    ) {
        let symbol = completion.symbol.clone();
        let Some(position) = self.tracker.get(&symbol).cloned() else {
            return;
        };

        let reference_exit = self.reference_price(reference).await;
        let text = render_completion(
            &position,
            &completion,
            self.reference_context(position.reference_price_at_entry, reference_exit),
        );

        let notifier = &self.notifier;
        let edits = join_all(position.notifications.iter().map(|n| {
            let text = &text;
            async move { (n.chat_id.clone(), notifier.edit(&n.chat_id, n.handle, text).await) }
        }))
        .await;

        let mut remaining = position.notifications.len();
        for (chat_id, result) in edits {
            match result {
                Ok(()) => remaining = self.tracker.acknowledge_completion(&symbol, &chat_id),
                Err(e) => {
                    error!(symbol = %symbol, chat_id = %chat_id, error = %e, "MonitorRuntime: failed to edit alert with completion");
                }
            }
        }

        if remaining == 0 {
            self.tracker.close(&symbol);
            let (h, m, s) = completion.elapsed_hms();
            info!(
                symbol = %symbol,
                entry_price = completion.entry_price,
                exit_price = completion.exit_price,
                drop_percent = completion.drop_percent,
                "MonitorRuntime: target reached after {}h {}m {}s, position closed",
                h,
                m,
                s
            );
            report.closed += 1;
        } else {
            match self.tracker.completion_failed(&symbol) {
                Some(CompletionRetry::Retry { attempts }) => {
                    warn!(symbol = %symbol, attempts = attempts, "MonitorRuntime: completion undelivered, retrying next cycle");
                    return;
                }
                Some(CompletionRetry::Expired(expired)) => {
                    error!(
                        symbol = %symbol,
                        attempts = expired.completion_attempts,
                        "MonitorRuntime: completion undelivered, giving up on position"
                    );
                    report.expired += 1;
                }
                None => return,
            }
        }

        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = audit.record_completion(&position, &completion, reference_exit) {
                warn!(symbol = %symbol, error = %e, "MonitorRuntime: audit write failed");
            }
        }
    }

    async fn reference_price(&self, cache: &mut ReferenceCache) -> Option<f64> {
        let symbol = self.config.reference_symbol.as_deref()?;
        if let Some(price) = cache.0 {
            return price;
        }
        let price = match self.market_data.get_latest_price(symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "MonitorRuntime: reference price unavailable");
                None
            }
        };
        cache.0 = Some(price);
        price
    }

    fn reference_context(
        &self,
        at_entry: Option<f64>,
        at_exit: Option<f64>,
    ) -> Option<ReferenceContext<'_>> {
        self.config
            .reference_symbol
            .as_deref()
            .map(|symbol| ReferenceContext {
                symbol,
                at_entry,
                at_exit,
            })
    }
}
