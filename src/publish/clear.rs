//! Bulk image removal.

use crate::publish::select::ImageEntry;
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Result of a removal pass.
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: Vec<String>,
    pub failed: Vec<(ImageEntry, RuntimeError)>,
}

impl ClearReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remove every entry, in the given order.
///
/// A failure is reported through `on_failure` and removal continues.
pub fn clear_images(
    runtime: &dyn ContainerRuntime,
    entries: &[ImageEntry],
    force: bool,
    mut on_failure: impl FnMut(&ImageEntry, &RuntimeError),
) -> ClearReport {
    let mut report = ClearReport::default();
    for entry in entries {
        let reference = entry.reference();
        match runtime.remove_image(reference, force) {
            Ok(()) => {
                tracing::debug!("Removed {}", reference);
                report.removed.push(reference.to_string());
            }
            Err(err) => {
                on_failure(entry, &err);
                report.failed.push((entry.clone(), err));
            }
        }
    }
    report
}
