//! Implementation of `ignis-images build`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::builder::{apply_version_tags, BuildPlan, BuildReport, Scheduler, SchedulerOptions};
use crate::core::{ImagePrefix, PipelineError};
use crate::recipes::{discover, expand, CustomImage, DiscoverOptions, ExpandOptions};
use crate::runtime::ContainerRuntime;
use crate::sources::{CollectOptions, SourceCollector};
use crate::util::config::{DEFAULT_DESCRIPTOR, DEFAULT_RECIPE_DIR};
use crate::util::shell::{Shell, Status};

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Remote git sources, fetched first
    pub remotes: Vec<String>,

    /// Local source directories
    pub locals: Vec<PathBuf>,

    /// Recipe folders to skip
    pub ignore: Vec<String>,

    /// Per-component version overrides
    pub version_filters: BTreeMap<String, String>,

    pub custom_images: Vec<CustomImage>,

    /// Also expand `common-builder`
    pub bases: bool,

    /// Add the `full` image of every component
    pub full: bool,

    /// Run-wide requested version
    pub version: Option<String>,

    /// Extra tags applied to every image after a successful run
    pub version_tags: Vec<String>,

    pub prefix: ImagePrefix,
    pub platform: Option<String>,

    /// Worker pool size (None = available parallelism)
    pub jobs: Option<usize>,

    /// Keep logs of successful builds too
    pub save_logs: bool,

    /// Directory receiving copied logs
    pub log_dir: PathBuf,

    pub recipe_dir: String,
    pub descriptor: String,

    /// Stop after printing the plan
    pub plan_only: bool,

    /// Print the plan as JSON
    pub json: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            remotes: Vec::new(),
            locals: Vec::new(),
            ignore: Vec::new(),
            version_filters: BTreeMap::new(),
            custom_images: Vec::new(),
            bases: false,
            full: false,
            version: None,
            version_tags: Vec::new(),
            prefix: ImagePrefix::default(),
            platform: None,
            jobs: None,
            save_logs: false,
            log_dir: PathBuf::from("."),
            recipe_dir: DEFAULT_RECIPE_DIR.to_string(),
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            plan_only: false,
            json: false,
        }
    }
}

/// What a build invocation produced.
#[derive(Debug)]
pub struct BuildResult {
    pub plan: BuildPlan,
    /// `None` when only the plan was requested
    pub report: Option<BuildReport>,
    /// References created by `--version-tags`
    pub extra_tags: Vec<String>,
}

/// Parse `NAME=VERSION` pairs into per-component overrides.
pub fn parse_version_filters(filters: &[String]) -> Result<BTreeMap<String, String>, PipelineError> {
    filters
        .iter()
        .map(|filter| match filter.split_once('=') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok((name.to_string(), version.to_string()))
            }
            _ => Err(PipelineError::InvalidVersionFilter(filter.clone())),
        })
        .collect()
}

/// Collect, discover and expand into a plan rooted at `workspace`.
pub fn plan_images(workspace: &Path, options: &BuildOptions, shell: &Shell) -> Result<BuildPlan> {
    let collector = SourceCollector::new(
        workspace,
        CollectOptions {
            recipe_dir: options.recipe_dir.clone(),
            version: options.version.clone(),
            overrides: options.version_filters.clone(),
            ignore: options.ignore.clone(),
        },
    );
    if !options.remotes.is_empty() {
        shell.status(
            Status::Fetching,
            format!("{} remote source(s)", options.remotes.len()),
        );
    }
    if !options.locals.is_empty() {
        shell.status(
            Status::Copying,
            format!("{} local source(s)", options.locals.len()),
        );
    }
    let trees = collector.collect(&options.remotes, &options.locals)?;
    for tree in &trees {
        shell.status(
            Status::Resolving,
            format!("{} {} ({})", tree.id(), tree.version(), tree.origin()),
        );
    }

    let discovery = discover(
        &trees,
        &DiscoverOptions {
            recipe_dir: options.recipe_dir.clone(),
            descriptor: options.descriptor.clone(),
            ignore: options.ignore.clone(),
            prefix: options.prefix.clone(),
        },
    )?;

    let units = expand(
        discovery,
        &ExpandOptions {
            bases: options.bases,
            full: options.full,
            custom_images: options.custom_images.clone(),
            version: options.version.clone(),
            prefix: options.prefix.clone(),
            workspace: workspace.to_path_buf(),
            descriptor: options.descriptor.clone(),
        },
    )?;

    Ok(BuildPlan::new(units))
}

/// Run the whole pipeline.
///
/// The scratch workspace is removed on every exit path. `runtime` may be
/// `None` only when `options.plan_only` is set.
pub fn build_images(
    runtime: Option<&dyn ContainerRuntime>,
    shell: &Arc<Shell>,
    options: &BuildOptions,
) -> Result<BuildResult> {
    let workspace = tempfile::Builder::new()
        .prefix("ignis")
        .tempdir()
        .context("failed to create build workspace")?;
    tracing::debug!("Build workspace at {}", workspace.path().display());

    let plan = plan_images(workspace.path(), options, shell)?;

    if options.json {
        shell.print(plan.to_json()?);
    } else {
        shell.print("Images:");
        shell.print(plan.to_string().trim_end());
    }

    if options.plan_only {
        return Ok(BuildResult {
            plan,
            report: None,
            extra_tags: Vec::new(),
        });
    }

    let runtime = runtime.context("a container runtime is required to build images")?;
    let scheduler_options = SchedulerOptions {
        prefix: options.prefix.clone(),
        platform: options.platform.clone(),
        log_dir: Some(options.log_dir.clone()),
        save_logs: options.save_logs,
        ..Default::default()
    };
    let scheduler_options = match options.jobs {
        Some(jobs) => SchedulerOptions {
            jobs,
            ..scheduler_options
        },
        None => scheduler_options,
    };

    let report = Scheduler::new(runtime, scheduler_options)
        .with_shell(Arc::clone(shell))
        .run(&plan)?;

    let images: Vec<_> = report
        .images()
        .map(|(unit, image)| (unit.clone(), image.clone()))
        .collect();
    let extra_tags = apply_version_tags(runtime, &images, &options.version_tags)?;
    for tag in &extra_tags {
        shell.status(Status::Tagged, tag);
    }

    Ok(BuildResult {
        plan,
        report: Some(report),
        extra_tags,
    })
}
