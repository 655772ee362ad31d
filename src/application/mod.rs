//! Application Layer - use cases wired over the ports
//!
//! - `AlertIntake`: admission accept path, candidate -> stored alert
//! - `TrackingScheduler`: the recurring classification and sweep loop

mod intake;
mod tracker;

pub use intake::{AlertIntake, IntakeError, IntakeResult};
pub use tracker::{CycleReport, SchedulerError, StopHandle, TrackerSettings, TrackingScheduler};
