//! Container runtime gateway.
//!
//! The only surface the pipeline uses to talk to the execution engine:
//! building, tagging, listing, removing and pushing images, plus running,
//! stopping and inspecting named containers.

pub mod docker;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use docker::DockerCli;

/// Error reported by the container runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("{message}")]
    CommandFailed { message: String },

    #[error("build failed: {message}")]
    BuildFailed { message: String },

    #[error("push of `{tag}` failed: {message}")]
    PushFailed { tag: String, message: String },

    #[error("cannot parse runtime output: {0}")]
    Parse(String),
}

/// Everything needed to build one image.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory
    pub context: PathBuf,
    /// Descriptor (Dockerfile) path
    pub descriptor: PathBuf,
    /// Reference to tag the result with
    pub tag: String,
    /// Image labels
    pub labels: BTreeMap<String, String>,
    /// Build-time arguments
    pub build_args: BTreeMap<String, String>,
    /// Target platform(s), if cross-building
    pub platform: Option<String>,
    /// File receiving the build output
    pub log: PathBuf,
}

/// Handle to a built image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub id: String,
}

impl ImageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ImageHandle { id: id.into() }
    }

    /// 12-character short id, without the digest algorithm.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Image metadata as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub id: String,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub parent: Option<String>,
}

impl ImageSummary {
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Selection criteria for `list_images`.
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    /// Repository reference pattern, e.g. `ignishpc/*`
    pub reference: Option<String>,
    /// Label filter, `key` or `key=value`
    pub label: Option<String>,
    /// Include intermediate layers
    pub all: bool,
}

/// A named container to run.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    /// host path -> container path
    pub mounts: Vec<(PathBuf, PathBuf)>,
    /// host port -> container port
    pub ports: Vec<(u16, u16)>,
    pub labels: BTreeMap<String, String>,
}

/// State of a named container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    /// Runtime state, e.g. `running`, `exited`
    pub state: String,
    pub labels: BTreeMap<String, String>,
}

/// The execution engine behind the pipeline.
///
/// Implementations must be usable from several pool threads at once.
pub trait ContainerRuntime: Send + Sync {
    /// Build an image. Output is written to `request.log`.
    fn build_image(&self, request: &BuildRequest) -> Result<ImageHandle, RuntimeError>;

    /// Add a tag to an existing image.
    fn tag_image(&self, image: &ImageHandle, new_tag: &str) -> Result<(), RuntimeError>;

    /// List images matching a filter.
    fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ImageSummary>, RuntimeError>;

    /// Remove an image by id or tag.
    fn remove_image(&self, reference: &str, force: bool) -> Result<(), RuntimeError>;

    /// Push a tag, reporting each progress line to `progress`.
    fn push_image(&self, tag: &str, progress: &mut dyn FnMut(&str))
        -> Result<(), RuntimeError>;

    /// Create and start a named container.
    fn run_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Stop a named container.
    fn stop_container(&self, name: &str) -> Result<(), RuntimeError>;

    /// Remove a named container.
    fn remove_container(&self, name: &str, force: bool) -> Result<(), RuntimeError>;

    /// Inspect a named container; `None` if it does not exist.
    fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, RuntimeError>;
}

/// 12-character short form of an image id.
pub fn short_id(id: &str) -> &str {
    let bare = id.split_once(':').map(|(_, h)| h).unwrap_or(id);
    &bare[..bare.len().min(12)]
}
