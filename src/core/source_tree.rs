//! Source trees collected into a build workspace.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a source tree came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Fetched from a remote git location.
    Remote(String),
    /// Copied from a local directory.
    Local(PathBuf),
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::Remote(url) => write!(f, "{}", url),
            SourceOrigin::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A source tree materialized inside the workspace.
///
/// Never mutated after collection.
#[derive(Debug, Clone)]
pub struct SourceTree {
    id: String,
    discriminator: usize,
    root: PathBuf,
    version: String,
    origin: SourceOrigin,
}

impl SourceTree {
    pub fn new(
        id: impl Into<String>,
        discriminator: usize,
        root: PathBuf,
        version: impl Into<String>,
        origin: SourceOrigin,
    ) -> Self {
        SourceTree {
            id: id.into(),
            discriminator,
            root,
            version: version.into(),
            origin,
        }
    }

    /// Identifier derived from the origin name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Collection order of this tree within the run.
    pub fn discriminator(&self) -> usize {
        self.discriminator
    }

    /// Root of the copied tree inside the workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolved version tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    /// Directory holding the build recipes.
    pub fn recipe_dir(&self, recipe_dir_name: &str) -> PathBuf {
        self.root.join(recipe_dir_name)
    }
}

impl fmt::Display for SourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}
