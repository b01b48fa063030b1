//! `ignis-images push` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalArgs, PushArgs};
use crate::commands::{image_prefix, select_options};
use ignis_images::ops::{push, PushOptions};
use ignis_images::runtime::DockerCli;
use ignis_images::util::GlobalContext;
use ignis_images::util::Shell;

pub fn execute(args: PushArgs, global: &GlobalArgs, shell: Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let runtime = DockerCli::new();

    let prefix = image_prefix(global, ctx.config(), Some(&runtime))?;
    let opts = PushOptions {
        select: select_options(prefix, args.version, args.allow.as_deref(), &args.deny, false),
        builders: args.builders || ctx.config().push.builders,
        yes: args.yes,
    };

    push(&runtime, &shell, &opts, &mut |q| shell.confirm(q))?;
    Ok(())
}
