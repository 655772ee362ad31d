//! Test doubles for the ports: a scripted price source and an in-memory
//! alert store. Used by scheduler unit tests and the integration suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Alert, AlertPatch, NewAlert, Outcome};
use crate::ports::price_source::{PriceSource, PriceSourceError};
use crate::ports::store::{AlertStore, OutcomeSummary, StoreError};

/// Price source that replays a scripted sequence of results per pool and
/// records every lookup it receives.
#[derive(Debug, Default)]
pub struct ScriptedPriceSource {
    // pool_address -> remaining responses, consumed front to back
    scripts: Mutex<HashMap<String, Vec<Result<f64, String>>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue prices for a pool; each call consumes one. The last price is
    /// repeated once the script runs out.
    pub fn with_prices(self, pool_address: &str, prices: &[f64]) -> Self {
        self.scripts.lock().unwrap().insert(
            pool_address.to_string(),
            prices.iter().map(|p| Ok(*p)).collect(),
        );
        self
    }

    /// Queue a single failure for a pool.
    pub fn with_failure(self, pool_address: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(pool_address.to_string(), vec![Err(message.to_string())]);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn current_price(
        &self,
        network: &str,
        pool_address: &str,
    ) -> Result<f64, PriceSourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((network.to_string(), pool_address.to_string()));

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(pool_address)
            .ok_or_else(|| PriceSourceError::NotFound {
                network: network.to_string(),
                pool_address: pool_address.to_string(),
            })?;

        let next = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue
                .first()
                .cloned()
                .ok_or(PriceSourceError::MissingPrice)?
        };

        next.map_err(PriceSourceError::Parse)
    }
}

/// Alert store backed by a plain map, sharing the patch semantics of the
/// SQLite adapter.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAlertStore {
    inner: Arc<Mutex<InMemoryInner>>,
}

#[derive(Debug, Default)]
struct InMemoryInner {
    alerts: HashMap<i64, Alert>,
    next_id: i64,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn insert(&self, alert: &NewAlert) -> Result<i64, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.alerts.insert(id, Alert::from_new(id, alert.clone()));
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Alert>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(inner.alerts.get(&id).cloned())
    }

    async fn get_open_alerts(&self, max_age_hours: f64) -> Result<Vec<Alert>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let now = Utc::now();
        let mut alerts: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| !a.is_closed && a.elapsed_hours(now) <= max_age_hours)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.id);
        Ok(alerts)
    }

    async fn get_expired_open_alerts(
        &self,
        horizon_hours: f64,
    ) -> Result<Vec<Alert>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let now = Utc::now();
        let mut alerts: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| !a.is_closed && a.elapsed_hours(now) > horizon_hours)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.id);
        Ok(alerts)
    }

    async fn apply_patch(&self, id: i64, patch: &AlertPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let alert = inner.alerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply_to(alert);
        Ok(())
    }

    async fn outcome_summary(&self) -> Result<OutcomeSummary, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let mut summary = OutcomeSummary::default();
        for alert in inner.alerts.values() {
            match alert.final_outcome {
                None => summary.open += 1,
                Some(Outcome::WinTp1) => summary.win_tp1 += 1,
                Some(Outcome::WinTp2) => summary.win_tp2 += 1,
                Some(Outcome::WinTp3) => summary.win_tp3 += 1,
                Some(Outcome::LossSl) => summary.loss_sl += 1,
                Some(Outcome::Timeout) => summary.timeout += 1,
            }
        }
        Ok(summary)
    }
}
