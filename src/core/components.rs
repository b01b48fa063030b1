//! Component builders and their library extensions.

use std::collections::BTreeMap;

use crate::core::unit::{BuildUnit, UnitKind};

/// Component providing the base image every composite layers on.
pub const COMMON: &str = "common";

/// Role marker installing the driver.
pub const DRIVER: &str = "driver";

/// Role marker installing the executor.
pub const EXECUTOR: &str = "executor";

/// Whether a component name stands for a cross-cutting role rather than a
/// real component.
pub fn is_reserved(name: &str) -> bool {
    name == DRIVER || name == EXECUTOR
}

/// Component name -> builder unit, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    builders: Vec<(String, BuildUnit)>,
}

impl ComponentRegistry {
    /// Collect every `Builder` unit whose component is not a reserved role.
    pub fn from_units<'a>(units: impl IntoIterator<Item = &'a BuildUnit>) -> Self {
        let builders = units
            .into_iter()
            .filter(|u| u.kind == UnitKind::Builder)
            .filter_map(|u| {
                let name = u.component_name()?;
                (!is_reserved(name)).then(|| (name.to_string(), u.clone()))
            })
            .collect();
        ComponentRegistry { builders }
    }

    pub fn get(&self, name: &str) -> Option<&BuildUnit> {
        self.builders
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, u)| u)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Component names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BuildUnit)> {
        self.builders.iter().map(|(n, u)| (n.as_str(), u))
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Whether any component other than the common base was discovered.
    pub fn has_real_component(&self) -> bool {
        self.names().any(|n| n != COMMON)
    }
}

/// Component name -> ids of its library extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryExtensions {
    by_component: BTreeMap<String, Vec<String>>,
}

impl LibraryExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: impl Into<String>, extension: impl Into<String>) {
        self.by_component
            .entry(component.into())
            .or_default()
            .push(extension.into());
    }

    /// Extensions of a component, empty if it has none.
    pub fn for_component(&self, component: &str) -> &[String] {
        self.by_component
            .get(component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_component.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_component.values().map(Vec::len).sum()
    }
}
