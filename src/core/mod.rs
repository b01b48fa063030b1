//! Core data structures for the image pipeline.
//!
//! This module contains the foundational types used throughout the crate:
//! - Image naming (registry/namespace prefixes, version labels)
//! - Source trees collected into a workspace
//! - Build units and their kinds
//! - Component registry and library extensions

pub mod components;
pub mod error;
pub mod image;
pub mod source_tree;
pub mod unit;

pub use components::{ComponentRegistry, LibraryExtensions};
pub use error::{BuildError, PipelineError};
pub use image::ImagePrefix;
pub use source_tree::{SourceOrigin, SourceTree};
pub use unit::{BuildUnit, DerivedRole, UnitKind};
