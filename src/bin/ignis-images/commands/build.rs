//! `ignis-images build` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs};
use crate::commands::image_prefix;
use ignis_images::ops::{build_images, parse_version_filters, BuildOptions};
use ignis_images::runtime::{ContainerRuntime, DockerCli};
use ignis_images::util::GlobalContext;
use ignis_images::util::Shell;

pub fn execute(args: BuildArgs, global: &GlobalArgs, shell: Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.config();

    // --plan never talks to the runtime
    let docker = (!args.plan).then(DockerCli::new);
    let runtime = docker.as_ref().map(|d| d as &dyn ContainerRuntime);

    let prefix = image_prefix(global, config, runtime)?;

    // Ignored folders: CLI extends config
    let mut ignore = config.build.ignore.clone();
    ignore.extend(args.ignore);

    let opts = BuildOptions {
        remotes: args.sources,
        locals: args.local_sources,
        ignore,
        version_filters: parse_version_filters(&args.version_filter)?,
        custom_images: args.custom_image,
        bases: args.bases,
        full: args.full,
        version: args.version,
        version_tags: args.version_tags,
        prefix,
        platform: args.platform.or_else(|| config.build.platform.clone()),
        jobs: args.jobs.or(config.build.jobs),
        save_logs: args.logs || config.build.save_logs,
        log_dir: ctx.log_dir().to_path_buf(),
        recipe_dir: config.recipe_dir().to_string(),
        descriptor: config.descriptor().to_string(),
        plan_only: args.plan,
        json: args.json,
    };

    build_images(runtime, &shell, &opts)?;
    Ok(())
}
