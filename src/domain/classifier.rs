//! Outcome Classifier
//!
//! Pure state machine that turns one price sample into a field patch for an
//! open alert. Evaluation order is a policy choice: stop-loss is checked
//! against the live sample before any take-profit, while take-profits are
//! checked against the running maximum from the highest target down.

use chrono::{DateTime, Utc};

use super::alert::{Alert, Outcome, TpLevel};
use super::patch::AlertPatch;

// Elapsed-hour windows for the one-shot checkpoint columns.
const WINDOW_1H: (f64, f64) = (0.5, 1.5);
const WINDOW_2H: (f64, f64) = (1.5, 3.0);
const WINDOW_4H: (f64, f64) = (3.0, 6.0);
const WINDOW_24H_LOWER: f64 = 23.0;

/// Classify one poll of an alert.
///
/// Returns the minimal patch to persist; empty when nothing changed. A
/// closed alert always yields an empty patch.
pub fn classify(
    alert: &Alert,
    price: f64,
    elapsed_hours: f64,
    now: DateTime<Utc>,
) -> AlertPatch {
    let mut patch = AlertPatch::new();

    if alert.is_closed {
        return patch;
    }

    // 1. Widen running extremes.
    let max_reached = match alert.price_max_reached {
        Some(max) if price > max => {
            patch.price_max_reached = Some(price);
            price
        }
        Some(max) => max,
        None => {
            patch.price_max_reached = Some(price);
            price
        }
    };
    match alert.price_min_reached {
        Some(min) if price < min => patch.price_min_reached = Some(price),
        Some(_) => {}
        None => patch.price_min_reached = Some(price),
    }

    // 2. First unset checkpoint whose window contains the elapsed time.
    record_checkpoint(alert, &mut patch, price, elapsed_hours);

    let targets = &alert.targets;

    // 3. Stop loss against the live sample, not the stale peak.
    if price <= targets.stop_loss_price {
        patch.sl_hit = Some(true);
        if alert.time_to_sl.is_none() {
            patch.time_to_sl = Some(elapsed_hours);
        }
        return patch.close(Outcome::LossSl, targets.gain_percent(price), now);
    }

    // 4-6. Take profits against the running max, highest target first.
    if max_reached >= targets.tp3_price && alert.highest_tp_reached < TpLevel::Tp3 {
        patch.highest_tp_reached = Some(TpLevel::Tp3);
        if alert.time_to_tp3.is_none() {
            patch.time_to_tp3 = Some(elapsed_hours);
        }
        return patch.close(
            Outcome::WinTp3,
            targets.gain_percent(targets.tp3_price),
            now,
        );
    }

    if max_reached >= targets.tp2_price && alert.highest_tp_reached < TpLevel::Tp2 {
        patch.highest_tp_reached = Some(TpLevel::Tp2);
        if alert.time_to_tp2.is_none() {
            patch.time_to_tp2 = Some(elapsed_hours);
        }
        return patch;
    }

    if max_reached >= targets.tp1_price && alert.highest_tp_reached < TpLevel::Tp1 {
        patch.highest_tp_reached = Some(TpLevel::Tp1);
        if alert.time_to_tp1.is_none() {
            patch.time_to_tp1 = Some(elapsed_hours);
        }
        return patch;
    }

    patch
}

fn record_checkpoint(alert: &Alert, patch: &mut AlertPatch, price: f64, elapsed_hours: f64) {
    if (WINDOW_1H.0..WINDOW_1H.1).contains(&elapsed_hours) && alert.price_1h_after.is_none() {
        patch.price_1h_after = Some(price);
    } else if (WINDOW_2H.0..WINDOW_2H.1).contains(&elapsed_hours) && alert.price_2h_after.is_none()
    {
        patch.price_2h_after = Some(price);
    } else if (WINDOW_4H.0..WINDOW_4H.1).contains(&elapsed_hours) && alert.price_4h_after.is_none()
    {
        patch.price_4h_after = Some(price);
    } else if elapsed_hours >= WINDOW_24H_LOWER && alert.price_24h_after.is_none() {
        patch.price_24h_after = Some(price);
    }
}

/// Close an expired alert with the outcome implied by its progress.
///
/// A reached TP wins at that TP's target price, an SL hit loses at the live
/// stop, and an alert that never touched anything times out at the latest
/// checkpoint price we managed to capture.
pub fn classify_expired(alert: &Alert, now: DateTime<Utc>) -> AlertPatch {
    let patch = AlertPatch::new();
    if alert.is_closed {
        return patch;
    }

    let targets = &alert.targets;
    let (outcome, reference_price) = match alert.highest_tp_reached {
        TpLevel::Tp3 => (Outcome::WinTp3, Some(targets.tp3_price)),
        TpLevel::Tp2 => (Outcome::WinTp2, Some(targets.tp2_price)),
        TpLevel::Tp1 => (Outcome::WinTp1, Some(targets.tp1_price)),
        TpLevel::None if alert.sl_hit => (Outcome::LossSl, Some(targets.stop_loss_price)),
        TpLevel::None => (Outcome::Timeout, alert.latest_checkpoint_price()),
    };

    let gain = reference_price
        .map(|p| targets.gain_percent(p))
        .unwrap_or(0.0);

    patch.close(outcome, gain, now)
}
