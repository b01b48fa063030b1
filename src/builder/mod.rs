//! Build scheduling.
//!
//! This module groups build units into tiers and executes them with
//! bounded parallelism against a container runtime.

pub mod outcome;
pub mod plan;
pub mod scheduler;

pub use outcome::{BuildOutcome, BuildReport, TierAborted};
pub use plan::{BuildPlan, Tier};
pub use scheduler::{apply_version_tags, Scheduler, SchedulerOptions};
