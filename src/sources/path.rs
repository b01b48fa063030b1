//! Path source - trees copied from the local filesystem.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::{PipelineError, SourceOrigin};
use crate::sources::{Fetched, Source};
use crate::util::fs::copy_dir_all;

/// A source tree copied from a local directory.
pub struct PathSource {
    /// The root path
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PathSource { path: path.into() }
    }
}

impl Source for PathSource {
    fn name(&self) -> &str {
        "path"
    }

    fn tree_id(&self) -> String {
        let canonical = self.path.canonicalize().unwrap_or_else(|_| self.path.clone());
        canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string())
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Local(self.path.clone())
    }

    fn materialize(&self, _staging: &Path, dest: &Path, recipe_dir: &str) -> Result<Fetched> {
        if !self.path.is_dir() {
            return Err(PipelineError::SourceNotFound {
                path: self.path.clone(),
            }
            .into());
        }
        if !self.path.join(recipe_dir).is_dir() {
            return Ok(Fetched::NoRecipes);
        }

        tracing::debug!("Copying {} to {}", self.path.display(), dest.display());
        copy_dir_all(&self.path, dest)?;
        Ok(Fetched::Ready)
    }
}
