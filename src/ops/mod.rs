//! High-level operations.
//!
//! This module contains the implementation of ignis-images commands.

pub mod images_build;
pub mod images_clear;
pub mod images_push;
pub mod status;

pub use images_build::{build_images, parse_version_filters, plan_images, BuildOptions, BuildResult};
pub use images_clear::{clear, ClearOptions};
pub use images_push::{push, PushOptions};
pub use status::{container_status, default_registry, resolve_registry};
