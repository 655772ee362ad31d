//! Alert Model
//!
//! One alert is one flagged opportunity under observation: a pool, the
//! TP/SL targets fixed when it was flagged, and the price tracking state
//! accumulated until the alert is closed exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing alert targets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("entry price must be > 0, got {0}")]
    InvalidEntry(f64),

    #[error("stop loss {sl} must be below entry {entry}")]
    StopLossAboveEntry { sl: f64, entry: f64 },

    #[error("take profits must satisfy entry < tp1 < tp2 < tp3, got {tp1}, {tp2}, {tp3}")]
    UnorderedTakeProfits { tp1: f64, tp2: f64, tp3: f64 },

    #[error("unknown take profit level: {0}")]
    UnknownTpLevel(String),

    #[error("unknown outcome: {0}")]
    UnknownOutcome(String),
}

/// Highest take-profit target the price has touched so far.
///
/// The derived `Ord` (None < Tp1 < Tp2 < Tp3) is the monotonicity relation:
/// the tracked level only ever advances, never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TpLevel {
    #[default]
    None,
    Tp1,
    Tp2,
    Tp3,
}

impl TpLevel {
    /// Storage representation ("TP1", "TP2", "TP3"); `None` is a NULL column.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            TpLevel::None => None,
            TpLevel::Tp1 => Some("TP1"),
            TpLevel::Tp2 => Some("TP2"),
            TpLevel::Tp3 => Some("TP3"),
        }
    }

    pub fn from_stored(value: Option<&str>) -> Result<Self, AlertError> {
        match value {
            None | Some("") => Ok(TpLevel::None),
            Some("TP1") => Ok(TpLevel::Tp1),
            Some("TP2") => Ok(TpLevel::Tp2),
            Some("TP3") => Ok(TpLevel::Tp3),
            Some(other) => Err(AlertError::UnknownTpLevel(other.to_string())),
        }
    }
}

/// Final classification of a closed alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WinTp1,
    WinTp2,
    WinTp3,
    LossSl,
    Timeout,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::WinTp1 => "WIN_TP1",
            Outcome::WinTp2 => "WIN_TP2",
            Outcome::WinTp3 => "WIN_TP3",
            Outcome::LossSl => "LOSS_SL",
            Outcome::Timeout => "TIMEOUT",
        }
    }

    pub fn from_stored(value: &str) -> Result<Self, AlertError> {
        match value {
            "WIN_TP1" => Ok(Outcome::WinTp1),
            "WIN_TP2" => Ok(Outcome::WinTp2),
            "WIN_TP3" => Ok(Outcome::WinTp3),
            "LOSS_SL" => Ok(Outcome::LossSl),
            "TIMEOUT" => Ok(Outcome::Timeout),
            other => Err(AlertError::UnknownOutcome(other.to_string())),
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::WinTp1 | Outcome::WinTp2 | Outcome::WinTp3)
    }
}

/// Price targets fixed at alert creation. Never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertTargets {
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub tp1_price: f64,
    pub tp2_price: f64,
    pub tp3_price: f64,
}

impl AlertTargets {
    /// Validate the target ladder: entry > 0, sl < entry < tp1 < tp2 < tp3.
    pub fn new(
        entry_price: f64,
        stop_loss_price: f64,
        tp1_price: f64,
        tp2_price: f64,
        tp3_price: f64,
    ) -> Result<Self, AlertError> {
        if !(entry_price > 0.0) {
            return Err(AlertError::InvalidEntry(entry_price));
        }
        if stop_loss_price >= entry_price {
            return Err(AlertError::StopLossAboveEntry {
                sl: stop_loss_price,
                entry: entry_price,
            });
        }
        if !(entry_price < tp1_price && tp1_price < tp2_price && tp2_price < tp3_price) {
            return Err(AlertError::UnorderedTakeProfits {
                tp1: tp1_price,
                tp2: tp2_price,
                tp3: tp3_price,
            });
        }
        Ok(Self {
            entry_price,
            stop_loss_price,
            tp1_price,
            tp2_price,
            tp3_price,
        })
    }

    /// Gain in percent of entry for a given price.
    pub fn gain_percent(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * 100.0
    }

    /// Target price for a reached level, if any.
    pub fn price_for_level(&self, level: TpLevel) -> Option<f64> {
        match level {
            TpLevel::None => None,
            TpLevel::Tp1 => Some(self.tp1_price),
            TpLevel::Tp2 => Some(self.tp2_price),
            TpLevel::Tp3 => Some(self.tp3_price),
        }
    }
}

/// A new alert about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub network: String,
    pub pool_address: String,
    pub token_name: String,
    pub targets: AlertTargets,
    pub created_at: DateTime<Utc>,
}

/// Full alert record as persisted.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: i64,
    pub network: String,
    pub pool_address: String,
    pub token_name: String,
    pub targets: AlertTargets,
    pub created_at: DateTime<Utc>,

    // Checkpoint prices, each written at most once
    pub price_1h_after: Option<f64>,
    pub price_2h_after: Option<f64>,
    pub price_4h_after: Option<f64>,
    pub price_24h_after: Option<f64>,

    // Running extremes since creation
    pub price_max_reached: Option<f64>,
    pub price_min_reached: Option<f64>,

    // Progress markers
    pub highest_tp_reached: TpLevel,
    pub sl_hit: bool,
    pub time_to_tp1: Option<f64>,
    pub time_to_tp2: Option<f64>,
    pub time_to_tp3: Option<f64>,
    pub time_to_sl: Option<f64>,

    // Terminal fields, set together exactly once
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub final_outcome: Option<Outcome>,
    pub final_gain_percent: Option<f64>,
}

impl Alert {
    /// Open alert with no tracking data yet, as inserted.
    pub fn from_new(id: i64, new: NewAlert) -> Self {
        Self {
            id,
            network: new.network,
            pool_address: new.pool_address,
            token_name: new.token_name,
            targets: new.targets,
            created_at: new.created_at,
            price_1h_after: None,
            price_2h_after: None,
            price_4h_after: None,
            price_24h_after: None,
            price_max_reached: None,
            price_min_reached: None,
            highest_tp_reached: TpLevel::None,
            sl_hit: false,
            time_to_tp1: None,
            time_to_tp2: None,
            time_to_tp3: None,
            time_to_sl: None,
            is_closed: false,
            closed_at: None,
            final_outcome: None,
            final_gain_percent: None,
        }
    }

    /// Hours elapsed from creation to `now`.
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 3600.0
    }

    /// Most recent checkpoint price captured, if any.
    pub fn latest_checkpoint_price(&self) -> Option<f64> {
        self.price_24h_after
            .or(self.price_4h_after)
            .or(self.price_2h_after)
            .or(self.price_1h_after)
    }
}
