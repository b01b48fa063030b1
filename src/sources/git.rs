//! Git source - trees cloned from remote repositories.

use std::path::Path;

use anyhow::Result;
use git2::Repository;
use url::Url;

use crate::core::{PipelineError, SourceOrigin};
use crate::sources::{Fetched, Source};
use crate::util::fs::{move_dir, remove_dir_all_if_exists};

/// A source tree fetched from a git remote.
pub struct GitSource {
    /// Remote repository location
    remote: String,
}

impl GitSource {
    pub fn new(remote: impl Into<String>) -> Self {
        GitSource {
            remote: remote.into(),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }
}

impl Source for GitSource {
    fn name(&self) -> &str {
        "git"
    }

    fn tree_id(&self) -> String {
        source_identifier(&self.remote)
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Remote(self.remote.clone())
    }

    fn materialize(&self, staging: &Path, dest: &Path, recipe_dir: &str) -> Result<Fetched> {
        tracing::info!("Cloning {}", self.remote);

        remove_dir_all_if_exists(staging)?;
        Repository::clone(&self.remote, staging).map_err(|e| PipelineError::FetchFailed {
            url: self.remote.clone(),
            message: e.message().to_string(),
        })?;

        if !staging.join(recipe_dir).is_dir() {
            remove_dir_all_if_exists(staging)?;
            return Ok(Fetched::NoRecipes);
        }

        move_dir(staging, dest)?;
        Ok(Fetched::Ready)
    }
}

/// Identifier of a remote: its final path segment without a `.git` suffix.
///
/// Accepts URLs (`https://host/org/core.git`) and scp-like locations
/// (`git@host:org/core.git`).
pub fn source_identifier(location: &str) -> String {
    let path = match Url::parse(location) {
        Ok(url) => url.path().to_string(),
        Err(_) => location.to_string(),
    };
    let trimmed = path.trim_end_matches('/');
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
