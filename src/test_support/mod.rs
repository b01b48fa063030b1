//! Test utilities and mocks for unit tests.
//!
//! This module provides a mock container runtime that records every call it
//! receives, plus fixture builders for recipe trees and git repositories.
//!
//! # Example
//!
//! ```rust,ignore
//! use ignis_images::test_support::{MockRuntime, RecipeTree};
//!
//! #[test]
//! fn test_example() {
//!     let runtime = MockRuntime::new().fail_build("python-builder", "exit code 1");
//!
//!     // Use the runtime in a scheduler...
//!     assert_eq!(runtime.built().len(), 3);
//! }
//! ```

pub mod fixtures;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::runtime::{
    BuildRequest, ContainerInfo, ContainerRuntime, ContainerSpec, ImageFilter, ImageHandle,
    ImageSummary, RuntimeError,
};
use crate::util::fs::write_string;

// Re-export fixtures for convenience
pub use fixtures::*;

/// A call observed by [`MockRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    BuildStarted(String),
    BuildFinished(String),
    Tagged { image: String, tag: String },
    Removed(String),
    Pushed(String),
    ContainerStarted(String),
    ContainerStopped(String),
    ContainerRemoved(String),
}

/// Mock container runtime for testing pipeline stages.
///
/// Builds succeed unless registered with [`MockRuntime::fail_build`]. Each
/// build writes its log file so log handling can be checked.
#[derive(Debug, Default)]
pub struct MockRuntime {
    events: Mutex<Vec<RuntimeEvent>>,
    requests: Mutex<Vec<BuildRequest>>,
    build_failures: BTreeMap<String, String>,
    build_delay: Option<Duration>,
    images: Vec<ImageSummary>,
    remove_failures: BTreeSet<String>,
    push_failures: BTreeMap<String, String>,
    containers: BTreeMap<String, ContainerInfo>,
}

impl MockRuntime {
    /// Create a runtime where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the build of the unit `id` with the given log text.
    pub fn fail_build(mut self, id: &str, log: &str) -> Self {
        self.build_failures.insert(id.to_string(), log.to_string());
        self
    }

    /// Keep each build running for `delay` before it completes.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    /// Add an image to the local store.
    pub fn with_image(mut self, image: ImageSummary) -> Self {
        self.images.push(image);
        self
    }

    /// Fail removal of the given reference.
    pub fn fail_remove(mut self, reference: &str) -> Self {
        self.remove_failures.insert(reference.to_string());
        self
    }

    /// Fail the push of `tag` mid-stream.
    pub fn fail_push(mut self, tag: &str, message: &str) -> Self {
        self.push_failures.insert(tag.to_string(), message.to_string());
        self
    }

    /// Add an existing container.
    pub fn with_container(mut self, info: ContainerInfo) -> Self {
        self.containers.insert(info.name.clone(), info);
        self
    }

    /// Get all calls, in the order they were observed.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        lock(&self.events).clone()
    }

    /// Build requests received.
    pub fn requests(&self) -> Vec<BuildRequest> {
        lock(&self.requests).clone()
    }

    /// Tags whose build was started.
    pub fn built(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::BuildStarted(tag) => Some(tag),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::Removed(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::Pushed(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: RuntimeEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Unit id of a fully-qualified tag: last path segment without the version.
pub fn unit_id_of(tag: &str) -> &str {
    let name = tag.rsplit('/').next().unwrap_or(tag);
    name.split(':').next().unwrap_or(name)
}

impl ContainerRuntime for MockRuntime {
    fn build_image(&self, request: &BuildRequest) -> Result<ImageHandle, RuntimeError> {
        lock(&self.requests).push(request.clone());
        self.record(RuntimeEvent::BuildStarted(request.tag.clone()));

        if let Some(delay) = self.build_delay {
            std::thread::sleep(delay);
        }

        let failure = self.build_failures.get(unit_id_of(&request.tag));
        let log = match failure {
            Some(log) => log.clone(),
            None => format!("Successfully built {}\n", request.tag),
        };
        write_string(&request.log, &log)
            .map_err(|e| RuntimeError::CommandFailed { message: e.to_string() })?;

        self.record(RuntimeEvent::BuildFinished(request.tag.clone()));
        match failure {
            Some(log) => Err(RuntimeError::BuildFailed {
                message: log.clone(),
            }),
            None => Ok(ImageHandle::new(format!("sha256:{}", request.tag))),
        }
    }

    fn tag_image(&self, image: &ImageHandle, new_tag: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeEvent::Tagged {
            image: image.id.clone(),
            tag: new_tag.to_string(),
        });
        Ok(())
    }

    fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ImageSummary>, RuntimeError> {
        let images = self
            .images
            .iter()
            .filter(|img| match &filter.reference {
                Some(pattern) => {
                    let prefix = pattern.trim_end_matches('*');
                    img.tags.iter().any(|t| t.starts_with(prefix))
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(images)
    }

    fn remove_image(&self, reference: &str, _force: bool) -> Result<(), RuntimeError> {
        if self.remove_failures.contains(reference) {
            return Err(RuntimeError::CommandFailed {
                message: format!("conflict: unable to remove {}", reference),
            });
        }
        self.record(RuntimeEvent::Removed(reference.to_string()));
        Ok(())
    }

    fn push_image(&self, tag: &str, progress: &mut dyn FnMut(&str)) -> Result<(), RuntimeError> {
        progress(&format!("The push refers to repository [{}]", tag));
        if let Some(message) = self.push_failures.get(tag) {
            return Err(RuntimeError::PushFailed {
                tag: tag.to_string(),
                message: message.clone(),
            });
        }
        self.record(RuntimeEvent::Pushed(tag.to_string()));
        Ok(())
    }

    fn run_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.record(RuntimeEvent::ContainerStarted(spec.name.clone()));
        Ok(format!("{}-id", spec.name))
    }

    fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeEvent::ContainerStopped(name.to_string()));
        Ok(())
    }

    fn remove_container(&self, name: &str, _force: bool) -> Result<(), RuntimeError> {
        self.record(RuntimeEvent::ContainerRemoved(name.to_string()));
        Ok(())
    }

    fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, RuntimeError> {
        Ok(self.containers.get(name).cloned())
    }
}

/// Assertion helpers.
pub mod assertions {
    /// Assert that a result is an error whose message contains `needle`.
    pub fn assert_error_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        match result {
            Ok(v) => panic!("expected error containing {:?}, got Ok({:?})", needle, v),
            Err(e) => {
                let message = format!("{:#}", e);
                assert!(
                    message.contains(needle),
                    "error {:?} does not contain {:?}",
                    message,
                    needle
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(tmp: &TempDir, tag: &str) -> BuildRequest {
        BuildRequest {
            context: tmp.path().to_path_buf(),
            descriptor: tmp.path().join("Dockerfile"),
            tag: tag.to_string(),
            labels: BTreeMap::new(),
            build_args: BTreeMap::new(),
            platform: None,
            log: tmp.path().join("logs").join(format!("{}.log", unit_id_of(tag))),
        }
    }

    #[test]
    fn test_unit_id_of() {
        assert_eq!(unit_id_of("reg:5000/ignishpc/python-builder:1.0"), "python-builder");
        assert_eq!(unit_id_of("ignishpc/full:latest"), "full");
        assert_eq!(unit_id_of("common"), "common");
    }

    #[test]
    fn test_mock_build_records_and_fails() {
        let tmp = TempDir::new().unwrap();
        let runtime = MockRuntime::new().fail_build("bad", "manifest for x not found");

        assert!(runtime.build_image(&request(&tmp, "ns/good:latest")).is_ok());
        let err = runtime.build_image(&request(&tmp, "ns/bad:latest")).unwrap_err();
        assert!(err.to_string().contains("manifest for x not found"));

        assert_eq!(runtime.built(), vec!["ns/good:latest", "ns/bad:latest"]);
        let log = std::fs::read_to_string(PathBuf::from(tmp.path()).join("logs/bad.log")).unwrap();
        assert_eq!(log, "manifest for x not found");
    }
}
