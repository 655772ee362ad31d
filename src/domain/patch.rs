//! Alert Patch
//!
//! Minimal field diff produced by the classifier and applied by the store.
//! A slot is `Some` only when the value actually changed, so persisting a
//! patch touches exactly the columns that moved and re-applying the same
//! classification yields an empty patch.

use chrono::{DateTime, Utc};

use super::alert::{Alert, Outcome, TpLevel};

/// Field diff for one alert update. Empty patch means nothing to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertPatch {
    pub price_1h_after: Option<f64>,
    pub price_2h_after: Option<f64>,
    pub price_4h_after: Option<f64>,
    pub price_24h_after: Option<f64>,

    pub price_max_reached: Option<f64>,
    pub price_min_reached: Option<f64>,

    pub highest_tp_reached: Option<TpLevel>,
    pub sl_hit: Option<bool>,
    pub time_to_tp1: Option<f64>,
    pub time_to_tp2: Option<f64>,
    pub time_to_tp3: Option<f64>,
    pub time_to_sl: Option<f64>,

    pub is_closed: Option<bool>,
    pub closed_at: Option<DateTime<Utc>>,
    pub final_outcome: Option<Outcome>,
    pub final_gain_percent: Option<f64>,
}

impl AlertPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this patch closes the alert.
    pub fn closes(&self) -> bool {
        self.is_closed == Some(true)
    }

    /// Set all terminal fields together. Closing is all-or-nothing.
    pub fn close(mut self, outcome: Outcome, gain_percent: f64, at: DateTime<Utc>) -> Self {
        self.is_closed = Some(true);
        self.closed_at = Some(at);
        self.final_outcome = Some(outcome);
        self.final_gain_percent = Some(gain_percent);
        self
    }

    /// Apply the patch to an in-memory record, mirroring the store update.
    pub fn apply_to(&self, alert: &mut Alert) {
        if let Some(v) = self.price_1h_after {
            alert.price_1h_after = Some(v);
        }
        if let Some(v) = self.price_2h_after {
            alert.price_2h_after = Some(v);
        }
        if let Some(v) = self.price_4h_after {
            alert.price_4h_after = Some(v);
        }
        if let Some(v) = self.price_24h_after {
            alert.price_24h_after = Some(v);
        }
        if let Some(v) = self.price_max_reached {
            alert.price_max_reached = Some(v);
        }
        if let Some(v) = self.price_min_reached {
            alert.price_min_reached = Some(v);
        }
        if let Some(v) = self.highest_tp_reached {
            alert.highest_tp_reached = v;
        }
        if let Some(v) = self.sl_hit {
            alert.sl_hit = v;
        }
        if let Some(v) = self.time_to_tp1 {
            alert.time_to_tp1 = Some(v);
        }
        if let Some(v) = self.time_to_tp2 {
            alert.time_to_tp2 = Some(v);
        }
        if let Some(v) = self.time_to_tp3 {
            alert.time_to_tp3 = Some(v);
        }
        if let Some(v) = self.time_to_sl {
            alert.time_to_sl = Some(v);
        }
        if let Some(v) = self.is_closed {
            alert.is_closed = v;
        }
        if let Some(v) = self.closed_at {
            alert.closed_at = Some(v);
        }
        if let Some(v) = self.final_outcome {
            alert.final_outcome = Some(v);
        }
        if let Some(v) = self.final_gain_percent {
            alert.final_gain_percent = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertTargets, NewAlert};

    fn open_alert() -> Alert {
        Alert::from_new(
            7,
            NewAlert {
                network: "bsc".to_string(),
                pool_address: "0xpool".to_string(),
                token_name: "TEST".to_string(),
                targets: AlertTargets::new(1.0, 0.90, 1.05, 1.10, 1.15).unwrap(),
                created_at: Utc::now(),
            },
        )
    }

    #[test]
    fn test_empty_patch() {
        let patch = AlertPatch::new();
        assert!(patch.is_empty());
        assert!(!patch.closes());
    }

    #[test]
    fn test_close_sets_all_terminal_fields() {
        let now = Utc::now();
        let patch = AlertPatch::new().close(Outcome::LossSl, -15.0, now);

        assert!(patch.closes());
        assert_eq!(patch.final_outcome, Some(Outcome::LossSl));
        assert_eq!(patch.final_gain_percent, Some(-15.0));
        assert_eq!(patch.closed_at, Some(now));
    }

    #[test]
    fn test_apply_to_updates_only_set_fields() {
        let mut alert = open_alert();
        let patch = AlertPatch {
            price_max_reached: Some(1.08),
            price_min_reached: Some(0.98),
            highest_tp_reached: Some(TpLevel::Tp1),
            time_to_tp1: Some(0.5),
            ..Default::default()
        };

        patch.apply_to(&mut alert);

        assert_eq!(alert.price_max_reached, Some(1.08));
        assert_eq!(alert.price_min_reached, Some(0.98));
        assert_eq!(alert.highest_tp_reached, TpLevel::Tp1);
        assert_eq!(alert.time_to_tp1, Some(0.5));
        // Untouched fields stay untouched
        assert!(alert.price_1h_after.is_none());
        assert!(!alert.is_closed);
    }

    #[test]
    fn test_apply_close_patch() {
        let mut alert = open_alert();
        let now = Utc::now();
        let patch = AlertPatch {
            highest_tp_reached: Some(TpLevel::Tp3),
            time_to_tp3: Some(1.2),
            ..Default::default()
        }
        .close(Outcome::WinTp3, 15.0, now);

        patch.apply_to(&mut alert);

        assert!(alert.is_closed);
        assert_eq!(alert.final_outcome, Some(Outcome::WinTp3));
        assert_eq!(alert.final_gain_percent, Some(15.0));
        assert_eq!(alert.closed_at, Some(now));
        assert_eq!(alert.highest_tp_reached, TpLevel::Tp3);
    }
}
