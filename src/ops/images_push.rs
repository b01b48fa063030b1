//! Implementation of `ignis-images push`.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::publish::push_images;
use crate::publish::select::{
    select_images, sort_oldest_first, without_builders, ImageTable, SelectOptions,
};
use crate::runtime::ContainerRuntime;
use crate::util::shell::{Shell, Status};

/// Options for the push command.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub select: SelectOptions,
    /// Also push `*builder` images
    pub builders: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
}

/// Push the selected images, oldest first.
///
/// Returns the pushed tags; empty when nothing was selected or the
/// operator declined.
pub fn push(
    runtime: &dyn ContainerRuntime,
    shell: &Shell,
    options: &PushOptions,
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<Vec<String>> {
    let mut entries = select_images(runtime, &options.select)?;
    if !options.builders {
        entries = without_builders(entries);
    }
    if entries.is_empty() {
        shell.note("no images found");
        return Ok(Vec::new());
    }
    sort_oldest_first(&mut entries);

    shell.print(ImageTable::new(&entries, Utc::now()).to_string().trim_end());
    if !options.yes && !confirm("Are you sure")? {
        shell.print("Aborted");
        return Ok(Vec::new());
    }

    let verbose = shell.is_verbose();
    let pushed = push_images(
        runtime,
        &entries,
        &mut |line| {
            if verbose {
                shell.print(format!("  {}", line));
            } else {
                tracing::debug!("{}", line);
            }
        },
        |tag| shell.status(Status::Pushed, tag),
    )
    .context("push aborted")?;
    Ok(pushed)
}
