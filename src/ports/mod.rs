//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - The pool price lookup (GeckoTerminal in production)
//! - The durable alert table (SQLite in production)

pub mod mocks;
pub mod price_source;
pub mod store;

pub use price_source::{PriceSource, PriceSourceError};
pub use store::{AlertStore, OutcomeSummary, StoreError};
