//! `ignis-images clear` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::{ClearArgs, GlobalArgs};
use crate::commands::{image_prefix, select_options};
use ignis_images::ops::{clear, ClearOptions};
use ignis_images::runtime::DockerCli;
use ignis_images::util::GlobalContext;
use ignis_images::util::Shell;

pub fn execute(args: ClearArgs, global: &GlobalArgs, shell: Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let runtime = DockerCli::new();

    let prefix = image_prefix(global, ctx.config(), Some(&runtime))?;
    let opts = ClearOptions {
        select: select_options(
            prefix,
            args.version,
            args.allow.as_deref(),
            &args.deny,
            args.none,
        ),
        force: args.force,
        yes: args.yes,
    };

    let report = clear(&runtime, &shell, &opts, &mut |q| shell.confirm(q))?;
    if let Some(report) = report {
        if !report.is_clean() {
            bail!("failed to remove {} image(s)", report.failed.len());
        }
    }
    Ok(())
}
