//! Version resolution for collected source trees.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use git2::build::CheckoutBuilder;
use git2::Repository;
use semver::Version;

use crate::core::image::LATEST;
use crate::core::PipelineError;
use crate::util::fs::remove_dir_all_if_exists;

/// Resolve the version of the tree at `path`.
///
/// Without a request the result is `latest`. A git-tracked tree is checked
/// out at the lowest tag (in version order) starting with `requested`. An
/// untracked tree takes `requested` verbatim.
pub fn resolve_version(tree: &str, path: &Path, requested: Option<&str>) -> Result<String> {
    let Some(requested) = requested else {
        return Ok(LATEST.to_string());
    };

    let repo = match Repository::open(path) {
        Ok(repo) => repo,
        Err(_) => {
            tracing::debug!("{} is not version controlled, using `{}`", tree, requested);
            return Ok(requested.to_string());
        }
    };

    let mut tags: Vec<String> = repo
        .tag_names(None)
        .with_context(|| format!("failed to list tags of {}", tree))?
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();
    sort_tags(&mut tags);

    let Some(tag) = tags.iter().find(|t| t.starts_with(requested)) else {
        return Err(PipelineError::VersionNotFound {
            tree: tree.to_string(),
            requested: requested.to_string(),
            available: tags,
        }
        .into());
    };

    checkout_tag(&repo, tag).with_context(|| format!("failed to checkout {} of {}", tag, tree))?;
    tracing::debug!("{} resolved `{}` to {}", tree, requested, tag);
    Ok(tag.clone())
}

fn checkout_tag(repo: &Repository, tag: &str) -> Result<()> {
    let commit = repo
        .revparse_single(&format!("refs/tags/{}", tag))?
        .peel_to_commit()?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Delete version-control metadata so it never reaches a build context.
pub fn strip_vcs_metadata(root: &Path) -> Result<()> {
    let git = root.join(".git");
    if git.is_file() {
        std::fs::remove_file(&git)
            .with_context(|| format!("failed to remove {}", git.display()))?;
        return Ok(());
    }
    remove_dir_all_if_exists(&git)
}

/// Sort tags in ascending version order.
///
/// Tags that are not versions sort after every version, by name.
pub fn sort_tags(tags: &mut [String]) {
    tags.sort_by(|a, b| match (parse_tag(a), parse_tag(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}

fn parse_tag(tag: &str) -> Option<Version> {
    parse_version_lenient(tag.strip_prefix('v').unwrap_or(tag))
}

/// Parse a version that may omit minor/patch components.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}
