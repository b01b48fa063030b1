//! Test fixtures for common test scenarios.
//!
//! This module provides recipe tree generators, git helpers and
//! pre-built units and images.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::{IndexAddOption, ObjectType, Repository, Signature};

use crate::core::unit::{BuildUnit, UnitKind};
use crate::runtime::ImageSummary;
use crate::util::config::{DEFAULT_DESCRIPTOR, DEFAULT_RECIPE_DIR};

/// Fixture for a source tree with build recipes.
#[derive(Debug, Clone)]
pub struct RecipeTree {
    root: PathBuf,
    /// Recipe dir relative path -> (descriptor content, order marker)
    recipes: Vec<(String, String, Option<String>)>,
    /// Extra files relative to the root
    files: Vec<(String, String)>,
}

impl RecipeTree {
    /// Create a fixture that will be written at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RecipeTree {
            root: root.into(),
            recipes: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Add a recipe at `Dockerfiles/<rel>/Dockerfile`.
    pub fn recipe(mut self, rel: &str, content: &str) -> Self {
        self.recipes
            .push((rel.to_string(), content.to_string(), None));
        self
    }

    /// Add a recipe with an order marker file.
    pub fn ordered_recipe(mut self, rel: &str, content: &str, order: &str) -> Self {
        self.recipes
            .push((rel.to_string(), content.to_string(), Some(order.to_string())));
        self
    }

    /// Add an arbitrary file relative to the tree root.
    pub fn file(mut self, rel: &str, content: &str) -> Self {
        self.files.push((rel.to_string(), content.to_string()));
        self
    }

    /// Write the tree to disk and return its root.
    pub fn create(self) -> PathBuf {
        let recipes = self.root.join(DEFAULT_RECIPE_DIR);
        std::fs::create_dir_all(&recipes).unwrap();

        for (rel, content, order) in &self.recipes {
            let dir = recipes.join(rel);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(DEFAULT_DESCRIPTOR), content).unwrap();
            if let Some(order) = order {
                std::fs::write(dir.join("order"), order).unwrap();
            }
        }

        for (rel, content) in &self.files {
            let path = self.root.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }

        self.root
    }
}

/// Commit every file under `root`, creating the repository if needed.
pub fn commit_all(root: &Path, message: &str) {
    let repo = Repository::open(root)
        .or_else(|_| Repository::init(root))
        .unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Ignis Tests", "tests@ignis.local").unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// Tag the current HEAD of the repository at `root`.
pub fn tag_head(root: &Path, tag: &str) {
    let repo = Repository::open(root).unwrap();
    let head = repo.head().unwrap().peel(ObjectType::Commit).unwrap();
    repo.tag_lightweight(tag, &head, false).unwrap();
}

/// A unit with workspace-relative paths under `base`.
pub fn unit_at(base: &Path, id: &str, tier: u32, kind: UnitKind) -> BuildUnit {
    let dir = base.join(id);
    BuildUnit {
        id: id.to_string(),
        display_name: format!("ignishpc/{}", id),
        context_path: base.to_path_buf(),
        descriptor_path: dir.join(DEFAULT_DESCRIPTOR),
        log_path: dir.join("build.log"),
        version: "latest".to_string(),
        tier,
        kind,
    }
}

/// Timestamp `secs` seconds after a fixed epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .unwrap()
}

/// An image in the local store.
pub fn image(id: &str, tags: &[&str], created: i64, parent: Option<&str>) -> ImageSummary {
    ImageSummary {
        id: id.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created: at(created),
        parent: parent.map(str::to_string),
    }
}
