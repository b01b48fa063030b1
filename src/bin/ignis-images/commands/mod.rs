//! Command implementations

pub mod build;
pub mod clear;
pub mod completions;
pub mod push;
pub mod status;

use anyhow::Result;

use crate::cli::GlobalArgs;
use ignis_images::core::ImagePrefix;
use ignis_images::ops::resolve_registry;
use ignis_images::publish::{SelectOptions, TagFilter};
use ignis_images::runtime::ContainerRuntime;
use ignis_images::util::Config;

/// Image prefix from flags, config and, with a runtime, the default registry.
pub fn image_prefix(
    global: &GlobalArgs,
    config: &Config,
    runtime: Option<&dyn ContainerRuntime>,
) -> Result<ImagePrefix> {
    let configured = global
        .registry
        .as_deref()
        .or(config.registry.url.as_deref());
    let registry = match runtime {
        Some(runtime) => resolve_registry(runtime, configured)?,
        None => configured.unwrap_or_default().to_string(),
    };
    let namespace = global.namespace.as_deref().unwrap_or(config.namespace());
    Ok(ImagePrefix::new(registry, namespace))
}

/// Selection shared by `clear` and `push`.
pub fn select_options(
    prefix: ImagePrefix,
    version: Option<String>,
    allow: Option<&[String]>,
    deny: &[String],
    add_none: bool,
) -> SelectOptions {
    SelectOptions {
        prefix,
        version,
        filter: TagFilter::new(allow, deny),
        add_none,
    }
}
