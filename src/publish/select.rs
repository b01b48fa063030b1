//! Selection of existing pipeline images.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::core::image::version_label_filter;
use crate::core::ImagePrefix;
use crate::publish::filter::{is_builder, TagFilter};
use crate::runtime::{short_id, ContainerRuntime, ImageFilter, ImageSummary, RuntimeError};

/// One selected image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub id: String,
    /// Full tag, `None` for untagged images
    pub tag: Option<String>,
    pub created: DateTime<Utc>,
}

impl ImageEntry {
    /// Reference used to address the image: its tag, or its id if untagged.
    pub fn reference(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.id)
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Options selecting images.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub prefix: ImagePrefix,
    /// Only images labeled with this version
    pub version: Option<String>,
    pub filter: TagFilter,
    /// Also select untagged images and their untagged ancestors
    pub add_none: bool,
}

/// List images of the pipeline matching `options`.
///
/// Tagged images yield one entry per matching tag.
pub fn select_images(
    runtime: &dyn ContainerRuntime,
    options: &SelectOptions,
) -> Result<Vec<ImageEntry>, RuntimeError> {
    let label = version_label_filter(options.version.as_deref());
    let listed = runtime.list_images(&ImageFilter {
        reference: Some(format!("{}*", options.prefix)),
        label: Some(label.clone()),
        all: false,
    })?;

    let mut entries = Vec::new();
    for image in &listed {
        for tag in &image.tags {
            let Some(name) = options.prefix.strip(tag) else {
                continue;
            };
            if options.filter.accepts(name) {
                entries.push(ImageEntry {
                    id: image.id.clone(),
                    tag: Some(tag.clone()),
                    created: image.created,
                });
            }
        }
    }

    if options.add_none {
        let tops = runtime.list_images(&ImageFilter {
            reference: None,
            label: Some(label.clone()),
            all: false,
        })?;
        let layers = runtime.list_images(&ImageFilter {
            reference: None,
            label: Some(label),
            all: true,
        })?;
        for image in untagged_chain(&tops, &layers) {
            entries.push(ImageEntry {
                id: image.id.clone(),
                tag: None,
                created: image.created,
            });
        }
    }

    tracing::debug!("Selected {} image reference(s)", entries.len());
    Ok(entries)
}

/// Untagged leaves plus their untagged ancestors.
///
/// Each chain stops at the first ancestor that carries a tag or is unknown.
pub fn untagged_chain<'a>(tops: &'a [ImageSummary], layers: &'a [ImageSummary]) -> Vec<&'a ImageSummary> {
    let by_id: BTreeMap<&str, &ImageSummary> = layers
        .iter()
        .chain(tops.iter())
        .map(|img| (img.id.as_str(), img))
        .collect();

    let mut pending: Vec<&ImageSummary> = tops.iter().filter(|img| img.is_untagged()).collect();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut result = Vec::new();

    while let Some(image) = pending.pop() {
        if !seen.insert(image.id.as_str()) {
            continue;
        }
        result.push(image);

        let parent = image
            .parent
            .as_deref()
            .filter(|p| !p.is_empty())
            .and_then(|p| by_id.get(p));
        if let Some(parent) = parent {
            if parent.is_untagged() {
                pending.push(parent);
            }
        }
    }
    result
}

/// Newest first, the removal order.
pub fn sort_newest_first(entries: &mut [ImageEntry]) {
    entries.sort_by(|a, b| b.created.cmp(&a.created));
}

/// Oldest first, the push order.
pub fn sort_oldest_first(entries: &mut [ImageEntry]) {
    entries.sort_by(|a, b| a.created.cmp(&b.created));
}

/// Drop builder images.
pub fn without_builders(entries: Vec<ImageEntry>) -> Vec<ImageEntry> {
    entries
        .into_iter()
        .filter(|e| !e.tag.as_deref().is_some_and(is_builder))
        .collect()
}

/// Human age such as `3 days ago`, padded for table output.
pub fn format_age(now: DateTime<Utc>, created: DateTime<Utc>) -> String {
    const PERIODS: [(&str, i64); 6] = [
        ("year", 60 * 60 * 24 * 365),
        ("month", 60 * 60 * 24 * 30),
        ("day", 60 * 60 * 24),
        ("hour", 60 * 60),
        ("minute", 60),
        ("second", 1),
    ];

    let seconds = (now - created).num_seconds();
    let text = PERIODS
        .iter()
        .find(|(_, period)| seconds >= *period)
        .map(|(name, period)| {
            let value = seconds / period;
            format!("{} {}{} ago", value, name, if value > 1 { "s" } else { "" })
        })
        .unwrap_or_else(|| "just now".to_string());
    format!("{:<16}", text)
}

/// Table of selected images.
pub struct ImageTable<'a> {
    entries: &'a [ImageEntry],
    now: DateTime<Utc>,
}

impl<'a> ImageTable<'a> {
    pub fn new(entries: &'a [ImageEntry], now: DateTime<Utc>) -> Self {
        ImageTable { entries, now }
    }
}

impl fmt::Display for ImageTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IMAGE ID       CREATED          TAG")?;
        for entry in self.entries {
            writeln!(
                f,
                "{:<12}   {} {}",
                entry.short_id(),
                format_age(self.now, entry.created),
                entry.tag.as_deref().unwrap_or("<none>")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, image, MockRuntime};

    #[test]
    fn test_select_strips_prefix_and_filters() {
        let runtime = MockRuntime::new()
            .with_image(image(
                "sha256:aaa",
                &["ignishpc/python:latest", "ignishpc/python:1.0"],
                10,
                None,
            ))
            .with_image(image("sha256:bbb", &["ignishpc/cpp:latest"], 20, None))
            .with_image(image("sha256:ccc", &["other/cpp:latest"], 30, None));

        let deny = vec!["python:1.0".to_string()];
        let options = SelectOptions {
            filter: TagFilter::new(None, &deny),
            ..Default::default()
        };
        let entries = select_images(&runtime, &options).unwrap();
        let tags: Vec<_> = entries.iter().map(|e| e.reference()).collect();
        assert_eq!(tags, vec!["ignishpc/python:latest", "ignishpc/cpp:latest"]);
    }

    #[test]
    fn test_untagged_chain_stops_at_tagged_ancestor() {
        let base = image("sha256:base", &["ignishpc/common:latest"], 0, None);
        let mid = image("sha256:mid", &[], 5, Some("sha256:base"));
        let leaf = image("sha256:leaf", &[], 9, Some("sha256:mid"));
        let other = image("sha256:other", &[], 7, Some("sha256:gone"));
        let tagged = image("sha256:top", &["ignishpc/python:latest"], 8, Some("sha256:mid"));

        let tops = vec![leaf.clone(), other.clone(), tagged.clone()];
        let layers = vec![base, mid, leaf, other, tagged];

        let mut ids: Vec<&str> = untagged_chain(&tops, &layers)
            .into_iter()
            .map(|i| i.id.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["sha256:leaf", "sha256:mid", "sha256:other"]);
    }

    #[test]
    fn test_shared_parent_selected_once() {
        let mid = image("sha256:mid", &[], 1, None);
        let a = image("sha256:a", &[], 2, Some("sha256:mid"));
        let b = image("sha256:b", &[], 3, Some("sha256:mid"));
        let tops = vec![a.clone(), b.clone()];
        let layers = vec![mid, a, b];

        assert_eq!(untagged_chain(&tops, &layers).len(), 3);
    }

    #[test]
    fn test_select_with_none() {
        let runtime = MockRuntime::new()
            .with_image(image("sha256:tagged", &["ignishpc/python:latest"], 10, None))
            .with_image(image("sha256:orphan", &[], 5, Some("sha256:tagged")));

        let options = SelectOptions {
            add_none: true,
            ..Default::default()
        };
        let entries = select_images(&runtime, &options).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].tag, None);
        assert_eq!(entries[1].reference(), "sha256:orphan");
    }

    #[test]
    fn test_sorting() {
        let mut entries = vec![
            ImageEntry { id: "a".into(), tag: None, created: at(10) },
            ImageEntry { id: "b".into(), tag: None, created: at(30) },
            ImageEntry { id: "c".into(), tag: None, created: at(20) },
        ];
        sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        sort_oldest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_without_builders() {
        let entries = vec![
            ImageEntry { id: "a".into(), tag: Some("ignishpc/python-builder:1.0".into()), created: at(0) },
            ImageEntry { id: "b".into(), tag: Some("ignishpc/python:1.0".into()), created: at(0) },
        ];
        let kept = without_builders(entries);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(at(7200), at(0)).trim_end(), "2 hours ago");
        assert_eq!(format_age(at(60), at(0)).trim_end(), "1 minute ago");
        assert_eq!(format_age(at(0), at(0)).trim_end(), "just now");
        assert_eq!(format_age(at(0), at(0)).len(), 16);
        assert_eq!(format_age(at(86_400 * 400), at(0)).trim_end(), "1 year ago");
    }

    #[test]
    fn test_table() {
        let entries = vec![ImageEntry {
            id: "sha256:0123456789abcdef".into(),
            tag: None,
            created: at(0),
        }];
        let table = ImageTable::new(&entries, at(120)).to_string();
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("IMAGE ID       CREATED          TAG"));
        assert_eq!(lines.next(), Some("0123456789ab   2 minutes ago    <none>"));
    }
}
