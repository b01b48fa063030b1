//! Source trees.
//!
//! Sources are responsible for placing recipe trees into the build
//! workspace (git remotes, local paths) and pinning their versions.

pub mod collector;
pub mod git;
pub mod path;
pub mod source;
pub mod version;

pub use collector::{CollectOptions, SourceCollector};
pub use git::GitSource;
pub use path::PathSource;
pub use source::{Fetched, Source};
