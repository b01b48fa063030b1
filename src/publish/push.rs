//! Image upload.

use crate::publish::select::ImageEntry;
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Push every tagged entry, in the given order.
///
/// The first error aborts the remaining pushes. Returns the pushed tags.
pub fn push_images(
    runtime: &dyn ContainerRuntime,
    entries: &[ImageEntry],
    progress: &mut dyn FnMut(&str),
    mut on_pushed: impl FnMut(&str),
) -> Result<Vec<String>, RuntimeError> {
    let mut pushed = Vec::new();
    for tag in entries.iter().filter_map(|e| e.tag.as_deref()) {
        tracing::debug!("Pushing {}", tag);
        runtime.push_image(tag, progress)?;
        on_pushed(tag);
        pushed.push(tag.to_string());
    }
    Ok(pushed)
}
