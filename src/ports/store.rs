//! Alert store port
//!
//! Durable table of alert records. No delete: closed alerts are kept for
//! backtesting. The patch update is the unit of atomicity.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Alert, AlertError, AlertPatch, NewAlert};

/// Storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection unavailable: {0}")]
    Connection(String),

    #[error("alert {0} not found")]
    NotFound(i64),

    #[error("corrupt stored record: {0}")]
    Corrupt(#[from] AlertError),
}

/// Per-outcome counts for the stats view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub open: u64,
    pub win_tp1: u64,
    pub win_tp2: u64,
    pub win_tp3: u64,
    pub loss_sl: u64,
    pub timeout: u64,
}

impl OutcomeSummary {
    pub fn closed(&self) -> u64 {
        self.win_tp1 + self.win_tp2 + self.win_tp3 + self.loss_sl + self.timeout
    }

    pub fn wins(&self) -> u64 {
        self.win_tp1 + self.win_tp2 + self.win_tp3
    }
}

/// Durable alert table.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert a new alert and return its assigned id.
    async fn insert(&self, alert: &NewAlert) -> Result<i64, StoreError>;

    /// Point lookup by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<Alert>, StoreError>;

    /// Open alerts created within the last `max_age_hours`.
    async fn get_open_alerts(&self, max_age_hours: f64) -> Result<Vec<Alert>, StoreError>;

    /// Open alerts older than the expiry horizon - input to the sweep.
    async fn get_expired_open_alerts(&self, horizon_hours: f64)
        -> Result<Vec<Alert>, StoreError>;

    /// Persist only the fields set in the patch. Empty patch is a no-op.
    async fn apply_patch(&self, id: i64, patch: &AlertPatch) -> Result<(), StoreError>;

    /// Counts per final outcome plus open alerts.
    async fn outcome_summary(&self) -> Result<OutcomeSummary, StoreError>;
}
