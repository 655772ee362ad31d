//! Admission Controller
//!
//! Accept/reject decision converting a detected pool event into a tracked
//! alert. Thresholds are per-network: low-activity chains run structurally
//! smaller absolute liquidity and volume, so a single global floor either
//! starves them of alerts or admits noise on the busy chains.

use std::collections::HashMap;

use serde::Deserialize;

/// Minimum on-chain activity a candidate must show on a given network.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NetworkThresholds {
    pub min_liquidity_usd: f64,
    pub min_volume_24h_usd: f64,
    pub min_txns_24h: u64,
}

impl NetworkThresholds {
    /// Conservative fallback applied to networks without an explicit entry.
    pub fn conservative_default() -> Self {
        Self {
            min_liquidity_usd: 100_000.0,
            min_volume_24h_usd: 50_000.0,
            min_txns_24h: 100,
        }
    }
}

/// Candidate pool event produced by the scanning collaborator.
#[derive(Debug, Clone)]
pub struct PoolCandidate {
    pub network: String,
    pub pool_address: String,
    pub token_name: String,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub total_txns_24h: u64,
    pub age_hours: f64,
}

/// Which minimum a rejected candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    LowLiquidity,
    LowVolume,
    LowTxnCount,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RejectReason::LowLiquidity => "liquidity below network minimum",
            RejectReason::LowVolume => "24h volume below network minimum",
            RejectReason::LowTxnCount => "24h transaction count below network minimum",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of an admission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Accepted,
    Rejected(RejectReason),
}

impl AdmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionDecision::Accepted)
    }
}

/// Pure admission policy over an immutable threshold table.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    thresholds: HashMap<String, NetworkThresholds>,
    default: NetworkThresholds,
}

impl AdmissionController {
    pub fn new(thresholds: HashMap<String, NetworkThresholds>, default: NetworkThresholds) -> Self {
        Self {
            thresholds,
            default,
        }
    }

    /// Thresholds that apply to a network, falling back to the default set.
    pub fn thresholds_for(&self, network: &str) -> &NetworkThresholds {
        self.thresholds.get(network).unwrap_or(&self.default)
    }

    /// Evaluate a candidate. Deterministic, no I/O.
    pub fn evaluate(&self, candidate: &PoolCandidate) -> AdmissionDecision {
        let t = self.thresholds_for(&candidate.network);

        if candidate.liquidity_usd < t.min_liquidity_usd {
            return AdmissionDecision::Rejected(RejectReason::LowLiquidity);
        }
        if candidate.volume_24h_usd < t.min_volume_24h_usd {
            return AdmissionDecision::Rejected(RejectReason::LowVolume);
        }
        if candidate.total_txns_24h < t.min_txns_24h {
            return AdmissionDecision::Rejected(RejectReason::LowTxnCount);
        }

        AdmissionDecision::Accepted
    }
}

impl Default for AdmissionController {
    /// Calibrated production table. Arbitrum runs relaxed minimums; every
    /// other network uses the strict defaults.
    fn default() -> Self {
        let mut thresholds = HashMap::new();
        let strict = NetworkThresholds::conservative_default();
        for network in ["solana", "bsc", "eth", "base", "avax", "polygon_pos"] {
            thresholds.insert(network.to_string(), strict);
        }
        thresholds.insert(
            "arbitrum".to_string(),
            NetworkThresholds {
                min_liquidity_usd: 2_000.0,
                min_volume_24h_usd: 400.0,
                min_txns_24h: 10,
            },
        );
        Self::new(thresholds, strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(network: &str, liquidity: f64, volume: f64, txns: u64) -> PoolCandidate {
        PoolCandidate {
            network: network.to_string(),
            pool_address: "0xpool".to_string(),
            token_name: "TEST".to_string(),
            liquidity_usd: liquidity,
            volume_24h_usd: volume,
            total_txns_24h: txns,
            age_hours: 2.0,
        }
    }

    #[test]
    fn test_arbitrum_relaxed_accepts_small_pool() {
        let controller = AdmissionController::default();
        let decision = controller.evaluate(&candidate("arbitrum", 5_000.0, 800.0, 15));
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_solana_strict_rejects_same_pool() {
        let controller = AdmissionController::default();
        let decision = controller.evaluate(&candidate("solana", 5_000.0, 800.0, 15));
        assert_eq!(
            decision,
            AdmissionDecision::Rejected(RejectReason::LowLiquidity)
        );
    }

    #[test]
    fn test_unknown_network_uses_default() {
        let controller = AdmissionController::default();

        let decision = controller.evaluate(&candidate("fantom", 5_000.0, 800.0, 15));
        assert!(!decision.is_accepted());

        let decision = controller.evaluate(&candidate("fantom", 150_000.0, 80_000.0, 200));
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_rejects_on_each_metric() {
        let controller = AdmissionController::default();

        let decision = controller.evaluate(&candidate("eth", 50_000.0, 80_000.0, 200));
        assert_eq!(
            decision,
            AdmissionDecision::Rejected(RejectReason::LowLiquidity)
        );

        let decision = controller.evaluate(&candidate("eth", 150_000.0, 10_000.0, 200));
        assert_eq!(
            decision,
            AdmissionDecision::Rejected(RejectReason::LowVolume)
        );

        let decision = controller.evaluate(&candidate("eth", 150_000.0, 80_000.0, 50));
        assert_eq!(
            decision,
            AdmissionDecision::Rejected(RejectReason::LowTxnCount)
        );
    }

    #[test]
    fn test_exact_minimum_is_accepted() {
        let controller = AdmissionController::default();
        let decision = controller.evaluate(&candidate("eth", 100_000.0, 50_000.0, 100));
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_custom_table_injection() {
        let mut table = HashMap::new();
        table.insert(
            "testnet".to_string(),
            NetworkThresholds {
                min_liquidity_usd: 1.0,
                min_volume_24h_usd: 1.0,
                min_txns_24h: 1,
            },
        );
        let controller =
            AdmissionController::new(table, NetworkThresholds::conservative_default());

        assert!(controller
            .evaluate(&candidate("testnet", 2.0, 2.0, 2))
            .is_accepted());
        assert!(!controller
            .evaluate(&candidate("mainnet", 2.0, 2.0, 2))
            .is_accepted());
    }
}
