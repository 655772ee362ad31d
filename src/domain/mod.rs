//! Domain Layer - Core business logic
//!
//! Pure types and functions: the alert record, the admission policy, the
//! outcome classifier, and the field-patch diff. No I/O here.

pub mod admission;
pub mod alert;
pub mod classifier;
pub mod patch;

pub use admission::{AdmissionController, AdmissionDecision, NetworkThresholds, PoolCandidate};
pub use alert::{Alert, AlertError, AlertTargets, NewAlert, Outcome, TpLevel};
pub use classifier::{classify, classify_expired};
pub use patch::AlertPatch;
