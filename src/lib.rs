//! Poolwatch - DEX Pool Alert Lifecycle Tracker
//!
//! Admits detected liquidity pools as tracked alerts with TP1-TP3 and
//! stop-loss targets, polls their prices on a schedule, and closes each
//! alert exactly once with its observed outcome.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Alert, AdmissionController, classifier)
//! - `ports`: Trait abstractions (PriceSource, AlertStore) and test doubles
//! - `adapters`: External implementations (GeckoTerminal, SQLite)
//! - `application`: AlertIntake and TrackingScheduler
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
