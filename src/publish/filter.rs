//! Allow/deny filtering of image tags.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::image::LATEST;

/// Final path segment ending in `builder`, with an optional tag.
static BUILDER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|/)[^/]*builder(:[^/:]+)?$").expect("valid regex"));

/// Whether a tag names a builder image.
pub fn is_builder(tag: &str) -> bool {
    BUILDER_TAG.is_match(tag)
}

/// Append `:latest` to names without a tag.
pub fn normalize(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:{}", name, LATEST)
    }
}

/// Allow-list and deny-list over `<id>:<version>` names.
///
/// Deny wins over allow. Without an allow-list every name is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    allow: Option<BTreeSet<String>>,
    deny: BTreeSet<String>,
}

impl TagFilter {
    pub fn new(allow: Option<&[String]>, deny: &[String]) -> Self {
        TagFilter {
            allow: allow.map(|names| names.iter().map(|n| normalize(n)).collect()),
            deny: deny.iter().map(|n| normalize(n)).collect(),
        }
    }

    /// Whether a name (tag with the prefix stripped) passes the filter.
    pub fn accepts(&self, name: &str) -> bool {
        if self.deny.contains(name) {
            return false;
        }
        match &self.allow {
            Some(allow) => allow.contains(name),
            None => true,
        }
    }
}
