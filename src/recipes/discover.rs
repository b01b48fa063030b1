//! Recipe discovery.
//!
//! Walks the recipe directory of each collected tree and turns every
//! descriptor file into a [`BuildUnit`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::unit::{BUILDER_SUFFIX, BUILDER_TIER, LIBRARY_SUFFIX, LIBRARY_TIER, PLAIN_TIER};
use crate::core::{BuildUnit, ImagePrefix, LibraryExtensions, PipelineError, SourceTree, UnitKind};
use crate::util::config::{DEFAULT_DESCRIPTOR, DEFAULT_RECIPE_DIR};

/// Name of the per-recipe file holding an explicit tier.
pub const ORDER_FILE: &str = "order";

/// Name of the per-unit build log.
pub const BUILD_LOG: &str = "build.log";

/// Options controlling discovery.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub recipe_dir: String,
    pub descriptor: String,
    /// Top-level recipe folders to skip
    pub ignore: Vec<String>,
    pub prefix: ImagePrefix,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        DiscoverOptions {
            recipe_dir: DEFAULT_RECIPE_DIR.to_string(),
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            ignore: Vec::new(),
            prefix: ImagePrefix::default(),
        }
    }
}

/// Result of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Units in discovery order
    pub units: Vec<BuildUnit>,
    /// Library extensions per owning component
    pub libraries: LibraryExtensions,
}

/// Discover build units in every tree.
///
/// Ids must be unique across all trees.
pub fn discover(trees: &[SourceTree], options: &DiscoverOptions) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();

    for tree in trees {
        for descriptor in find_descriptors(tree, options)? {
            let unit = unit_for(tree, &descriptor, options)?;

            if let Some(first) = seen.get(&unit.id) {
                return Err(PipelineError::DuplicateUnit {
                    id: unit.id.clone(),
                    first: first.clone(),
                    second: unit.descriptor_path.clone(),
                }
                .into());
            }
            seen.insert(unit.id.clone(), unit.descriptor_path.clone());

            if let UnitKind::LibraryExtension { component } = &unit.kind {
                let extension = unit.id.strip_suffix(BUILDER_SUFFIX).unwrap_or(&unit.id);
                discovery.libraries.insert(component.clone(), extension);
            }

            tracing::debug!("Discovered {} (tier {}, {})", unit.id, unit.tier, unit.kind.label());
            discovery.units.push(unit);
        }
    }

    Ok(discovery)
}

/// Descriptor files of a tree, sorted by path.
fn find_descriptors(tree: &SourceTree, options: &DiscoverOptions) -> Result<Vec<PathBuf>> {
    let recipes = tree.recipe_dir(&options.recipe_dir);

    let mut folders: Vec<PathBuf> = std::fs::read_dir(&recipes)
        .with_context(|| format!("failed to read recipe directory: {}", recipes.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            let name = entry.file_name();
            !options.ignore.iter().any(|i| name.to_string_lossy() == i.as_str())
        })
        .map(|entry| entry.path())
        .collect();
    folders.sort();

    let mut descriptors = Vec::new();
    for folder in folders {
        for entry in WalkDir::new(&folder).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk {}", folder.display()))?;
            if entry.file_type().is_file() && entry.file_name() == options.descriptor.as_str() {
                descriptors.push(entry.into_path());
            }
        }
    }
    Ok(descriptors)
}

fn unit_for(tree: &SourceTree, descriptor: &Path, options: &DiscoverOptions) -> Result<BuildUnit> {
    let recipes = tree.recipe_dir(&options.recipe_dir);
    let dir = descriptor.parent().unwrap_or(recipes.as_path());
    let segments: Vec<String> = dir
        .strip_prefix(&recipes)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let raw_id = segments.join("-");

    let (id, kind, default_tier) = classify(&raw_id, &segments);
    let tier = match read_order(dir)? {
        Some(tier) => tier,
        None => default_tier,
    };

    Ok(BuildUnit {
        display_name: options.prefix.display_name(&id),
        id,
        context_path: tree.root().to_path_buf(),
        descriptor_path: descriptor.to_path_buf(),
        log_path: dir.join(BUILD_LOG),
        version: tree.version().to_string(),
        tier,
        kind,
    })
}

/// Decide the kind of a recipe from its id and path segments.
///
/// Library extensions are relabeled with the builder suffix.
fn classify(raw_id: &str, segments: &[String]) -> (String, UnitKind, u32) {
    if raw_id.ends_with(BUILDER_SUFFIX) {
        return (raw_id.to_string(), UnitKind::Builder, BUILDER_TIER);
    }
    if let Some(component) = library_component(raw_id, segments) {
        return (
            format!("{}{}", raw_id, BUILDER_SUFFIX),
            UnitKind::LibraryExtension { component },
            LIBRARY_TIER,
        );
    }
    (raw_id.to_string(), UnitKind::Plain, PLAIN_TIER)
}

/// Owning component of a library recipe, if it is one.
///
/// A nested recipe is a library when its last folder is `lib`, `lib-*` or
/// `*-lib`, and belongs to its first folder. A top-level recipe is a library
/// when its name ends in `-lib` or contains `-lib-`.
fn library_component(raw_id: &str, segments: &[String]) -> Option<String> {
    let is_lib = |s: &str| s == "lib" || s.starts_with("lib-") || s.ends_with(LIBRARY_SUFFIX);

    match segments {
        [] => None,
        [single] => single
            .strip_suffix(LIBRARY_SUFFIX)
            .or_else(|| single.split_once("-lib-").map(|(c, _)| c))
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        [first, .., last] if is_lib(last) => Some(first.clone()),
        _ => {
            tracing::trace!("{} is not a library recipe", raw_id);
            None
        }
    }
}

/// Read the explicit tier of a recipe folder.
fn read_order(dir: &Path) -> Result<Option<u32>> {
    let path = dir.join(ORDER_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = contents.lines().next().unwrap_or("").trim();
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| {
            PipelineError::InvalidOrder {
                path,
                value: value.to_string(),
            }
            .into()
        })
}
