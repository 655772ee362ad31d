//! Alert Intake
//!
//! The admission accept path: evaluate a candidate pool event and, when it
//! passes, persist a new alert for the tracking scheduler to pick up.
//! Notifying anyone about the new alert is the caller's business.

use chrono::Utc;
use thiserror::Error;

use crate::domain::admission::RejectReason;
use crate::domain::{AdmissionController, AdmissionDecision, AlertTargets, NewAlert, PoolCandidate};
use crate::ports::store::{AlertStore, StoreError};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of submitting one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeResult {
    /// Accepted and stored under this alert id.
    Admitted(i64),
    /// Rejected by the admission policy.
    Rejected(RejectReason),
}

/// Converts detected pool events into tracked alerts.
pub struct AlertIntake<S: AlertStore> {
    controller: AdmissionController,
    store: S,
}

impl<S: AlertStore> AlertIntake<S> {
    pub fn new(controller: AdmissionController, store: S) -> Self {
        Self { controller, store }
    }

    /// Evaluate a candidate; on accept, insert the alert record.
    pub async fn submit(
        &self,
        candidate: PoolCandidate,
        targets: AlertTargets,
    ) -> Result<IntakeResult, IntakeError> {
        match self.controller.evaluate(&candidate) {
            AdmissionDecision::Rejected(reason) => {
                tracing::debug!(
                    "rejected {} on {}: {}",
                    candidate.token_name,
                    candidate.network,
                    reason
                );
                Ok(IntakeResult::Rejected(reason))
            }
            AdmissionDecision::Accepted => {
                let alert = NewAlert {
                    network: candidate.network,
                    pool_address: candidate.pool_address,
                    token_name: candidate.token_name,
                    targets,
                    created_at: Utc::now(),
                };
                let id = self.store.insert(&alert).await?;
                tracing::info!(
                    "alert {} admitted: {} on {} entry ${}",
                    id,
                    alert.token_name,
                    alert.network,
                    targets.entry_price
                );
                Ok(IntakeResult::Admitted(id))
            }
        }
    }
}
