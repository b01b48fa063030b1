//! Named container status and the default registry lookup.

use anyhow::{Context, Result};

use crate::runtime::ContainerRuntime;

/// Container that may advertise a default registry.
pub const REGISTRY_CONTAINER: &str = "ignis-registry";

/// Label marking the registry container as the default one.
pub const REGISTRY_DEFAULT_LABEL: &str = "IGNIS_REGISTRY_DEFAULT";

/// Label holding the registry address.
pub const REGISTRY_LABEL: &str = "IGNIS_REGISTRY";

/// Status reported for a container that does not exist.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// `NOT_FOUND` or the upper-cased runtime state of a named container.
pub fn container_status(runtime: &dyn ContainerRuntime, name: &str) -> Result<String> {
    let info = runtime
        .inspect_container(name)
        .with_context(|| format!("failed to inspect container `{}`", name))?;
    Ok(match info {
        Some(info) => info.state.to_uppercase(),
        None => NOT_FOUND.to_string(),
    })
}

/// Registry advertised by the `ignis-registry` container, if any.
pub fn default_registry(runtime: &dyn ContainerRuntime) -> Result<Option<String>> {
    let info = runtime
        .inspect_container(REGISTRY_CONTAINER)
        .with_context(|| format!("failed to inspect container `{}`", REGISTRY_CONTAINER))?;
    Ok(info.and_then(|info| {
        if info.labels.contains_key(REGISTRY_DEFAULT_LABEL) {
            info.labels.get(REGISTRY_LABEL).cloned()
        } else {
            None
        }
    }))
}

/// Configured registry, else the advertised default, else none.
pub fn resolve_registry(
    runtime: &dyn ContainerRuntime,
    configured: Option<&str>,
) -> Result<String> {
    if let Some(registry) = configured {
        return Ok(registry.to_string());
    }
    let registry = default_registry(runtime)?.unwrap_or_default();
    if !registry.is_empty() {
        tracing::debug!("Using default registry {}", registry);
    }
    Ok(registry)
}
