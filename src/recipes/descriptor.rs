//! Generated build descriptors for derived and composite images.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::components::{COMMON, DRIVER, EXECUTOR};
use crate::core::unit::BUILDER_SUFFIX;
use crate::core::ImagePrefix;
use crate::util::fs::write_string;

/// Descriptor layering component builder outputs onto the common base.
///
/// `common` is implicit since it is the base image. `driver` and `executor`
/// are role markers that run their install steps last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeDescriptor {
    components: Vec<String>,
    driver: bool,
    executor: bool,
    prefix: ImagePrefix,
    version: String,
}

impl CompositeDescriptor {
    pub fn new<S: AsRef<str>>(constituents: &[S], prefix: &ImagePrefix, version: &str) -> Self {
        let mut components: Vec<String> = constituents
            .iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        components.sort();
        components.dedup();

        let driver = components.iter().any(|c| c == DRIVER);
        let executor = components.iter().any(|c| c == EXECUTOR);
        components.retain(|c| c != COMMON && c != DRIVER && c != EXECUTOR);

        CompositeDescriptor {
            components,
            driver,
            executor,
            prefix: prefix.clone(),
            version: version.to_string(),
        }
    }

    /// Components copied as builder layers, sorted.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn has_driver(&self) -> bool {
        self.driver
    }

    pub fn has_executor(&self) -> bool {
        self.executor
    }

    /// Builder image every layer is copied from.
    pub fn builder_image(&self, component: &str) -> String {
        self.prefix
            .tagged(&format!("{}{}", component, BUILDER_SUFFIX), &self.version)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("ARG REGISTRY=\"\"\n");
        out.push_str("ARG NAMESPACE=\"ignishpc/\"\n");
        out.push_str("ARG TAG=\"\"\n");
        out.push_str("FROM ${REGISTRY}${NAMESPACE}common${TAG}\n");
        out.push_str("ARG RELPATH=\"\"\n");

        for component in &self.components {
            out.push_str(&format!(
                "COPY --from={} ${{IGNIS_HOME}} ${{IGNIS_HOME}}\n",
                self.builder_image(component)
            ));
            out.push_str(&format!(
                "RUN ${{IGNIS_HOME}}/bin/ignis-{c}-install.sh && rm -f ${{IGNIS_HOME}}/bin/ignis-{c}-install.sh\n",
                c = component
            ));
        }

        if self.driver {
            out.push_str("RUN ${IGNIS_HOME}/common/driver-install.sh\n");
        }
        if self.executor {
            out.push_str("RUN ${IGNIS_HOME}/common/executor-install.sh\n");
        }
        out
    }

    /// Write the descriptor as `<dir>/<file_name>`.
    pub fn write(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        write_string(&path, &self.render())?;
        Ok(path)
    }
}
