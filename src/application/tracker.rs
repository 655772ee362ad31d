//! Tracking Scheduler
//!
//! The cyclic driver: each cycle loads open alerts, polls the price source
//! per alert, runs the outcome classifier, persists the resulting patches,
//! and sweeps alerts past the expiry horizon. No single alert's failure is
//! ever fatal to a cycle, and no cycle's failure is fatal to the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{classifier, Alert, Outcome};
use crate::ports::price_source::PriceSource;
use crate::ports::store::{AlertStore, StoreError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Scheduler knobs, taken from the tracking config section.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Sleep between cycles.
    pub poll_interval: Duration,
    /// Alerts older than this and still open get force-closed.
    pub expiry_horizon_hours: f64,
    /// Delay between price lookups inside a cycle.
    pub rate_delay: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1800),
            expiry_horizon_hours: 48.0,
            rate_delay: Duration::from_millis(200),
        }
    }
}

/// What one cycle did. Logged every cycle and returned by the `cycle` CLI
/// command so tests can assert on a single deterministic run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Alerts successfully polled and classified
    pub tracked: usize,
    /// Alerts skipped because of adapter or store failures
    pub skipped: usize,
    /// Non-terminal TP advances persisted
    pub advanced: usize,
    /// Alerts closed as WIN_TP3 this cycle
    pub closed_tp3: usize,
    /// Alerts closed as LOSS_SL this cycle
    pub closed_sl: usize,
    /// Expired alerts closed by the sweep
    pub swept: usize,
}

/// Drives the alert lifecycle against a price source and a store.
pub struct TrackingScheduler<P: PriceSource, S: AlertStore> {
    price_source: P,
    store: S,
    settings: TrackerSettings,
    is_running: Arc<RwLock<bool>>,
}

impl<P: PriceSource, S: AlertStore> TrackingScheduler<P, S> {
    pub fn new(price_source: P, store: S, settings: TrackerSettings) -> Self {
        Self {
            price_source,
            store,
            settings,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Handle for stopping the loop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            is_running: Arc::clone(&self.is_running),
        }
    }

    /// Run cycles until stopped. Cycle errors are logged, never fatal.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        *self.is_running.write().await = true;
        tracing::info!(
            "tracking scheduler started - interval {:?}, horizon {}h",
            self.settings.poll_interval,
            self.settings.expiry_horizon_hours
        );

        while *self.is_running.read().await {
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    "cycle done: tracked={} skipped={} advanced={} tp3={} sl={} swept={}",
                    report.tracked,
                    report.skipped,
                    report.advanced,
                    report.closed_tp3,
                    report.closed_sl,
                    report.swept
                ),
                Err(e) => tracing::error!("cycle failed: {}", e),
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        tracing::info!("tracking scheduler stopped");
        Ok(())
    }

    /// One full cycle: classify every open alert, then sweep expired ones.
    pub async fn run_cycle(&self) -> Result<CycleReport, SchedulerError> {
        let mut report = CycleReport::default();

        let alerts = self
            .store
            .get_open_alerts(self.settings.expiry_horizon_hours)
            .await?;
        tracing::debug!("{} open alerts to track", alerts.len());

        for alert in &alerts {
            match self.track_one(alert).await {
                Ok(outcome) => {
                    report.tracked += 1;
                    match outcome {
                        TrackOutcome::ClosedTp3 => report.closed_tp3 += 1,
                        TrackOutcome::ClosedSl => report.closed_sl += 1,
                        TrackOutcome::Advanced => report.advanced += 1,
                        TrackOutcome::Unchanged => {}
                    }
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(
                        "alert {} ({} on {}): skipped this cycle: {}",
                        alert.id,
                        alert.token_name,
                        alert.network,
                        e
                    );
                }
            }
            tokio::time::sleep(self.settings.rate_delay).await;
        }

        report.swept = self.sweep_expired().await?;
        Ok(report)
    }

    /// Poll, classify and persist a single alert.
    async fn track_one(&self, alert: &Alert) -> anyhow::Result<TrackOutcome> {
        let price = self
            .price_source
            .current_price(&alert.network, &alert.pool_address)
            .await?;

        let now = Utc::now();
        let elapsed = alert.elapsed_hours(now);
        let patch = classifier::classify(alert, price, elapsed, now);
        if patch.is_empty() {
            return Ok(TrackOutcome::Unchanged);
        }

        let closed = patch.closes();
        let outcome = patch.final_outcome;
        let advanced = patch.highest_tp_reached.is_some();
        self.store.apply_patch(alert.id, &patch).await?;

        if closed {
            tracing::info!(
                "alert {} closed: {} ({:+.2}%)",
                alert.id,
                outcome.map(|o| o.as_str()).unwrap_or("?"),
                patch.final_gain_percent.unwrap_or(0.0)
            );
        }

        Ok(match outcome {
            Some(Outcome::WinTp3) => TrackOutcome::ClosedTp3,
            Some(Outcome::LossSl) => TrackOutcome::ClosedSl,
            _ if advanced => TrackOutcome::Advanced,
            _ => TrackOutcome::Unchanged,
        })
    }

    /// Force-close every open alert older than the horizon.
    pub async fn sweep_expired(&self) -> Result<usize, SchedulerError> {
        let expired = self
            .store
            .get_expired_open_alerts(self.settings.expiry_horizon_hours)
            .await?;

        let mut swept = 0;
        let now = Utc::now();
        for alert in &expired {
            let patch = classifier::classify_expired(alert, now);
            if patch.is_empty() {
                continue;
            }
            match self.store.apply_patch(alert.id, &patch).await {
                Ok(()) => {
                    swept += 1;
                    tracing::info!(
                        "alert {} expired after {}h, closed as {} (progress: {:?})",
                        alert.id,
                        self.settings.expiry_horizon_hours,
                        patch.final_outcome.map(|o| o.as_str()).unwrap_or("?"),
                        alert.highest_tp_reached
                    );
                }
                Err(e) => {
                    tracing::warn!("alert {}: sweep close failed, retry next cycle: {}", alert.id, e)
                }
            }
        }
        Ok(swept)
    }
}

enum TrackOutcome {
    Unchanged,
    Advanced,
    ClosedTp3,
    ClosedSl,
}

/// Cloneable stop signal for the running scheduler.
#[derive(Clone)]
pub struct StopHandle {
    is_running: Arc<RwLock<bool>>,
}

impl StopHandle {
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("stop signal sent to tracking scheduler");
    }
}
