//! Source trait - common interface for remote and local source trees.

use std::path::Path;

use anyhow::Result;

use crate::core::SourceOrigin;

/// Outcome of materializing a source into the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// The tree was placed at the destination.
    Ready,
    /// The tree has no recipe directory and was left out.
    NoRecipes,
}

/// A place source trees come from.
pub trait Source {
    /// Get the source kind for display.
    fn name(&self) -> &str;

    /// Identifier of the tree, derived from its origin name.
    fn tree_id(&self) -> String;

    /// Where the tree came from.
    fn origin(&self) -> SourceOrigin;

    /// Place the tree at `dest`.
    ///
    /// `staging` is a scratch path shared by all sources of a run; callers
    /// must materialize sources one at a time.
    fn materialize(&self, staging: &Path, dest: &Path, recipe_dir: &str) -> Result<Fetched>;
}
