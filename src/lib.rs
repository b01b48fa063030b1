//! ignis-images - A tiered container image build pipeline
//!
//! This crate collects recipe sources, discovers and expands them into
//! build units, builds them tier by tier against a container runtime,
//! and publishes or clears the resulting images.

pub mod builder;
pub mod core;
pub mod ops;
pub mod publish;
pub mod recipes;
pub mod runtime;
pub mod sources;
pub mod util;

/// Test utilities and mocks for ignis-images unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording container runtime and recipe
/// tree fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildPlan, Scheduler, TierAborted};
pub use core::{BuildError, BuildUnit, PipelineError, UnitKind};
pub use runtime::{ContainerRuntime, DockerCli};
pub use util::context::GlobalContext;
