//! Implementation of `ignis-images clear`.

use anyhow::Result;
use chrono::Utc;

use crate::publish::select::{select_images, sort_newest_first, ImageTable, SelectOptions};
use crate::publish::{clear_images, ClearReport};
use crate::runtime::ContainerRuntime;
use crate::util::shell::{Shell, Status};

/// Options for the clear command.
#[derive(Debug, Clone, Default)]
pub struct ClearOptions {
    pub select: SelectOptions,
    /// Force removal of images used by containers
    pub force: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
}

/// Remove the selected images, newest first.
///
/// Returns `None` when nothing was selected or the operator declined.
pub fn clear(
    runtime: &dyn ContainerRuntime,
    shell: &Shell,
    options: &ClearOptions,
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<Option<ClearReport>> {
    let mut entries = select_images(runtime, &options.select)?;
    if entries.is_empty() {
        shell.note("no images found");
        return Ok(None);
    }
    sort_newest_first(&mut entries);

    shell.print(ImageTable::new(&entries, Utc::now()).to_string().trim_end());
    if !options.yes && !confirm("Are you sure")? {
        shell.print("Aborted");
        return Ok(None);
    }

    let report = clear_images(runtime, &entries, options.force, |entry, err| {
        shell.error(format!("{}: {}", entry.reference(), err));
    });
    for removed in &report.removed {
        shell.status(Status::Removed, removed);
    }
    Ok(Some(report))
}
