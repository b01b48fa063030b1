//! Source collection into a scratch workspace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::SourceTree;
use crate::sources::version::{resolve_version, strip_vcs_metadata};
use crate::sources::{Fetched, GitSource, PathSource, Source};
use crate::util::config::DEFAULT_RECIPE_DIR;
use crate::util::fs::{copy_dir_all, ensure_dir, remove_dir_all_if_exists};

/// Options for collecting source trees.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Recipe directory a tree must contain to be kept
    pub recipe_dir: String,

    /// Run-wide requested version
    pub version: Option<String>,

    /// Per-component version overrides, keyed by recipe folder name
    pub overrides: BTreeMap<String, String>,

    /// Recipe folders that are not components
    pub ignore: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        CollectOptions {
            recipe_dir: DEFAULT_RECIPE_DIR.to_string(),
            version: None,
            overrides: BTreeMap::new(),
            ignore: Vec::new(),
        }
    }
}

impl CollectOptions {
    /// Requested version for a component, overrides first.
    pub fn requested_for(&self, component: &str) -> Option<&str> {
        self.overrides
            .get(component)
            .map(String::as_str)
            .or(self.version.as_deref())
    }
}

/// Materializes source trees into `<workspace>/sources`.
pub struct SourceCollector {
    workspace: PathBuf,
    options: CollectOptions,
}

impl SourceCollector {
    pub fn new(workspace: impl Into<PathBuf>, options: CollectOptions) -> Self {
        SourceCollector {
            workspace: workspace.into(),
            options,
        }
    }

    /// Directory holding the collected trees.
    pub fn sources_dir(&self) -> PathBuf {
        self.workspace.join("sources")
    }

    fn staging_dir(&self) -> PathBuf {
        self.workspace.join("tmp")
    }

    /// Collect remote then local sources, in the given order.
    ///
    /// Remote fetches share one staging path and are processed serially.
    /// Trees without a recipe directory are skipped with a warning. A tree
    /// whose components request different versions is split into one
    /// tree per version.
    pub fn collect(&self, remotes: &[String], locals: &[PathBuf]) -> Result<Vec<SourceTree>> {
        let mut sources: Vec<Box<dyn Source>> = Vec::with_capacity(remotes.len() + locals.len());
        sources.extend(
            remotes
                .iter()
                .map(|r| Box::new(GitSource::new(r.as_str())) as Box<dyn Source>),
        );
        sources.extend(
            locals
                .iter()
                .map(|p| Box::new(PathSource::new(p)) as Box<dyn Source>),
        );

        ensure_dir(&self.sources_dir())?;

        let mut trees = Vec::new();
        for (discriminator, source) in sources.iter().enumerate() {
            trees.extend(self.collect_one(discriminator, source.as_ref())?);
        }

        remove_dir_all_if_exists(&self.staging_dir())?;
        Ok(trees)
    }

    fn collect_one(&self, discriminator: usize, source: &dyn Source) -> Result<Vec<SourceTree>> {
        let id = source.tree_id();
        let dest = self
            .sources_dir()
            .join(format!("{}-{}", discriminator, id));

        let fetched = source.materialize(&self.staging_dir(), &dest, &self.options.recipe_dir)?;
        if fetched == Fetched::NoRecipes {
            tracing::warn!(
                "{} ignored, {} folder not found",
                source.origin(),
                self.options.recipe_dir
            );
            return Ok(Vec::new());
        }

        let groups = self.group_by_version(self.components(&dest)?);
        if let [(requested, _)] = groups.as_slice() {
            let tree = self.finish(discriminator, source, &id, dest, requested.as_deref(), &[])?;
            return Ok(vec![tree]);
        }

        let mut trees = Vec::with_capacity(groups.len());
        for (index, (requested, components)) in groups.iter().enumerate() {
            let split = self
                .sources_dir()
                .join(format!("{}-{}-{}", discriminator, id, components[0]));
            copy_dir_all(&dest, &split)?;

            let others: Vec<&str> = groups
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .flat_map(|(_, (_, members))| members.iter().map(String::as_str))
                .collect();
            tracing::debug!("Split {} for {}", id, components.join(", "));
            trees.push(self.finish(
                discriminator,
                source,
                &id,
                split,
                requested.as_deref(),
                &others,
            )?);
        }
        remove_dir_all_if_exists(&dest)?;
        Ok(trees)
    }

    /// Check out the requested version, drop `excluded` components and
    /// seal the tree.
    ///
    /// Components are dropped after checkout, which restores the full tree.
    fn finish(
        &self,
        discriminator: usize,
        source: &dyn Source,
        id: &str,
        root: PathBuf,
        requested: Option<&str>,
        excluded: &[&str],
    ) -> Result<SourceTree> {
        let version = resolve_version(id, &root, requested)?;
        let recipes = root.join(&self.options.recipe_dir);
        for component in excluded {
            remove_dir_all_if_exists(&recipes.join(component))?;
        }
        strip_vcs_metadata(&root)?;

        tracing::debug!("Collected {} ({}) at {}", id, source.name(), root.display());
        Ok(SourceTree::new(
            id.to_string(),
            discriminator,
            root,
            version,
            source.origin(),
        ))
    }

    /// Top-level recipe folders of a tree, sorted.
    fn components(&self, root: &Path) -> Result<Vec<String>> {
        let recipes = root.join(&self.options.recipe_dir);
        let mut names: Vec<String> = std::fs::read_dir(&recipes)
            .with_context(|| format!("failed to read recipe directory: {}", recipes.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !self.options.ignore.contains(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Group components sharing a requested version, in first-seen order.
    ///
    /// Never empty: a tree without components gets the run-wide request.
    fn group_by_version(&self, components: Vec<String>) -> Vec<(Option<String>, Vec<String>)> {
        let mut groups: Vec<(Option<String>, Vec<String>)> = Vec::new();
        for component in components {
            let requested = self.options.requested_for(&component).map(str::to_string);
            match groups.iter_mut().find(|(r, _)| *r == requested) {
                Some((_, members)) => members.push(component),
                None => groups.push((requested, vec![component])),
            }
        }
        if groups.is_empty() {
            groups.push((self.options.version.clone(), Vec::new()));
        }
        groups
    }
}
