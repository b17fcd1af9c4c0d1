//! Cron-based scheduler driving the evaluation cycle

use crate::core::runtime::MonitorRuntime;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler disabled: interval_seconds is 0")]
    Disabled,
    #[error("invalid cron expression '{expr}': {source}")]
    Cron {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
    #[error("interval of {0}s is longer than the {max}s cron limit", max = MAX_INTERVAL_SECONDS)]
    TooLong(u64),
    #[error("scheduler already running")]
    AlreadyRunning,
}

/// Longest interval a six-field cron step can express (12h in the hour field)
pub const MAX_INTERVAL_SECONDS: u64 = 12 * 3600;

/// Cron expression (second minute hour day month weekday) ticking every
/// `interval_seconds`. Intervals that do not divide their unit evenly tick
/// at the unit boundary as well.
pub fn interval_to_cron(interval_seconds: u64) -> String {
    if interval_seconds >= 3600 && interval_seconds % 3600 == 0 {
        format!("0 0 */{} * * *", interval_seconds / 3600)
    } else if interval_seconds >= 60 {
        format!("0 */{} * * * *", (interval_seconds / 60).min(59))
    } else {
        format!("*/{} * * * * *", interval_seconds)
    }
}

/// Runs one full cycle per cron tick. The next tick is computed only after
/// the previous cycle (both passes) has finished, so cycles never overlap.
pub struct CycleScheduler {
    schedule: Schedule,
    interval_seconds: u64,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl CycleScheduler {
    pub fn new(interval_seconds: u64) -> Result<Self, SchedulerError> {
        if interval_seconds == 0 {
            return Err(SchedulerError::Disabled);
        }
        if interval_seconds > MAX_INTERVAL_SECONDS {
            return Err(SchedulerError::TooLong(interval_seconds));
        }

        let cron_expr = interval_to_cron(interval_seconds);
        let schedule = Schedule::from_str(&cron_expr).map_err(|source| SchedulerError::Cron {
            expr: cron_expr.clone(),
            source,
        })?;

        let uneven = if interval_seconds < 60 {
            60 % interval_seconds != 0
        } else if interval_seconds < 3600 {
            interval_seconds % 60 != 0 || 3600 % interval_seconds != 0
        } else {
            interval_seconds % 3600 != 0 || 24 % (interval_seconds / 3600) != 0
        };
        if uneven {
            warn!(
                interval = interval_seconds,
                cron = %cron_expr,
                "CycleScheduler: interval does not divide evenly, ticks follow cron '{}'",
                cron_expr
            );
        }

        info!(
            interval = interval_seconds,
            cron = %cron_expr,
            "CycleScheduler: created with interval {}s (cron: {})",
            interval_seconds,
            cron_expr
        );

        Ok(Self {
            schedule,
            interval_seconds,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    /// First scheduled tick strictly after `after`
    pub fn next_tick_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Start the loop; the first cycle runs immediately
    pub async fn start(&self, mut runtime: MonitorRuntime) -> Result<(), SchedulerError> {
        let mut slot = self.handle.write().await;
        if slot.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let schedule = self.schedule.clone();
        let handle = tokio::spawn(async move {
            info!(
                symbol_count = runtime.config().symbols.len(),
                "CycleScheduler: started, running first cycle"
            );
            runtime.run_cycle().await;

            loop {
                let Some(next_tick) = schedule.upcoming(Utc).next() else {
                    error!("CycleScheduler: schedule has no upcoming ticks, waiting");
                    tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                    continue;
                };

                let now = Utc::now();
                if next_tick > now {
                    let duration = (next_tick - now).to_std().unwrap_or_default();
                    tokio::time::sleep(duration).await;
                }

                runtime.run_cycle().await;
            }
        });

        *slot = Some(handle);
        info!("CycleScheduler: started successfully");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("CycleScheduler: stopped");
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
