//! Fully-qualified image references.
//!
//! Every image produced by a build run is named `<registry><namespace><id>`,
//! where both the registry and the namespace are either empty or end in `/`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default image namespace.
pub const DEFAULT_NAMESPACE: &str = "ignishpc";

/// Label attached to every built image. Its value is the build version.
pub const VERSION_LABEL: &str = "ignis";

/// Tag used when no version was requested.
pub const LATEST: &str = "latest";

/// Registry + namespace prefix shared by all images of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrefix {
    registry: String,
    namespace: String,
}

impl ImagePrefix {
    /// Create a prefix, normalizing both parts to end in `/` when non-empty.
    pub fn new(registry: impl AsRef<str>, namespace: impl AsRef<str>) -> Self {
        ImagePrefix {
            registry: with_trailing_slash(registry.as_ref()),
            namespace: with_trailing_slash(namespace.as_ref()),
        }
    }

    /// Registry part (empty or ending in `/`).
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Namespace part (empty or ending in `/`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fully-qualified name for an image id, without tag.
    pub fn display_name(&self, id: &str) -> String {
        format!("{}{}{}", self.registry, self.namespace, id)
    }

    /// Fully-qualified reference `<name>:<version>`.
    pub fn tagged(&self, id: &str, version: &str) -> String {
        format!("{}:{}", self.display_name(id), version)
    }

    /// Strip the prefix from a full tag, returning `<id>:<version>`.
    ///
    /// Returns `None` if the tag does not belong to this prefix.
    pub fn strip<'a>(&self, tag: &'a str) -> Option<&'a str> {
        tag.strip_prefix(self.to_string().as_str())
    }
}

impl Default for ImagePrefix {
    fn default() -> Self {
        ImagePrefix::new("", DEFAULT_NAMESPACE)
    }
}

impl fmt::Display for ImagePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.registry, self.namespace)
    }
}

fn with_trailing_slash(s: &str) -> String {
    if s.is_empty() || s.ends_with('/') {
        s.to_string()
    } else {
        format!("{}/", s)
    }
}

/// Label filter selecting images of a run: `ignis` or `ignis=<version>`.
pub fn version_label_filter(version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{}={}", VERSION_LABEL, v),
        None => VERSION_LABEL.to_string(),
    }
}
