//! Build units: one image-build job each.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Default tier for `*-builder` recipes.
pub const BUILDER_TIER: u32 = 50;

/// Default tier for plain recipes.
pub const PLAIN_TIER: u32 = 100;

/// Default tier for library extensions.
pub const LIBRARY_TIER: u32 = 200;

/// Lowest tier a derived unit may be placed on.
pub const DERIVED_TIER: u32 = 300;

/// Suffix marking builder recipes.
pub const BUILDER_SUFFIX: &str = "-builder";

/// Suffix marking library extension recipes.
pub const LIBRARY_SUFFIX: &str = "-lib";

/// Role of a unit synthesized from a component builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedRole {
    /// Component with the driver installed.
    Driver,
    /// Component with the executor installed.
    Executor,
    /// Component with both driver and executor installed.
    Combined,
}

impl fmt::Display for DerivedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedRole::Driver => write!(f, "driver"),
            DerivedRole::Executor => write!(f, "executor"),
            DerivedRole::Combined => write!(f, "combined"),
        }
    }
}

/// Classification of a build unit, decided once when the unit is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UnitKind {
    /// A recipe built as-is.
    Plain,
    /// A recipe whose image is a layer source for other units.
    Builder,
    /// A library addendum for `component`, built like a builder but never
    /// expanded further.
    LibraryExtension { component: String },
    /// Synthesized from the builder of `component`.
    Derived {
        component: String,
        role: DerivedRole,
    },
    /// Aggregate of several components.
    Composite,
}

impl UnitKind {
    /// Short label for plan listings.
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::Plain => "plain",
            UnitKind::Builder => "builder",
            UnitKind::LibraryExtension { .. } => "library",
            UnitKind::Derived { .. } => "derived",
            UnitKind::Composite => "composite",
        }
    }
}

/// One image-build job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildUnit {
    /// Unique id within the run
    pub id: String,

    /// Image name without tag (registry + namespace + id)
    pub display_name: String,

    /// Build context directory
    pub context_path: PathBuf,

    /// Build descriptor file
    pub descriptor_path: PathBuf,

    /// Where build output is captured
    pub log_path: PathBuf,

    /// Resolved tag
    pub version: String,

    /// Scheduling tier; lower tiers build first
    pub tier: u32,

    /// Classification
    #[serde(flatten)]
    pub kind: UnitKind,
}

impl BuildUnit {
    /// Fully-qualified reference `<display_name>:<version>`.
    pub fn tag(&self) -> String {
        format!("{}:{}", self.display_name, self.version)
    }

    /// Directory containing the descriptor.
    pub fn descriptor_dir(&self) -> PathBuf {
        self.descriptor_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.context_path.clone())
    }

    /// Name of the component a builder unit stands for.
    pub fn component_name(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Builder => self.id.strip_suffix(BUILDER_SUFFIX),
            UnitKind::LibraryExtension { component } | UnitKind::Derived { component, .. } => {
                Some(component)
            }
            _ => None,
        }
    }
}

impl fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
