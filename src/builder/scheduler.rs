//! Tiered build scheduler.
//!
//! Each tier is dispatched to a bounded worker pool and the scheduler waits
//! for every unit of the tier before moving on. A tier with any failure
//! stops the run; units already started always run to completion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use regex::Regex;

use crate::builder::outcome::{BuildOutcome, BuildReport, TierAborted};
use crate::builder::plan::BuildPlan;
use crate::core::image::VERSION_LABEL;
use crate::core::{BuildError, BuildUnit, ImagePrefix};
use crate::runtime::{BuildRequest, ContainerRuntime, ImageHandle, RuntimeError};
use crate::util::fs::relative_path;
use crate::util::shell::{format_duration, Progress, Shell, Status};

/// Patterns of runtime messages reporting a missing upstream image.
static MISSING_IMAGE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"manifest for (\S+) not found",
        r"failed to resolve source metadata for (\S+?):\s",
        r"pull access denied for (\S+?),",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Options for running a plan.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Worker pool size
    pub jobs: usize,
    pub prefix: ImagePrefix,
    pub platform: Option<String>,
    /// Directory receiving `ignisbuild-<id>.log` copies
    pub log_dir: Option<PathBuf>,
    /// Keep logs of successful builds too
    pub save_logs: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            prefix: ImagePrefix::default(),
            platform: None,
            log_dir: None,
            save_logs: false,
        }
    }
}

/// Runs a [`BuildPlan`] against a container runtime.
pub struct Scheduler<'a> {
    runtime: &'a dyn ContainerRuntime,
    options: SchedulerOptions,
    shell: Option<Arc<Shell>>,
}

impl<'a> Scheduler<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, options: SchedulerOptions) -> Self {
        Scheduler {
            runtime,
            options,
            shell: None,
        }
    }

    /// Report progress and per-unit results on `shell`.
    pub fn with_shell(mut self, shell: Arc<Shell>) -> Self {
        self.shell = Some(shell);
        self
    }

    /// Run every tier in order.
    ///
    /// Returns a [`TierAborted`] error (inside `anyhow`) when a tier fails.
    pub fn run(&self, plan: &BuildPlan) -> Result<BuildReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.max(1))
            .thread_name(|i| format!("ignis-build-{}", i))
            .build()
            .context("failed to create build worker pool")?;

        let start = Instant::now();
        let progress = self
            .shell
            .as_ref()
            .map(|shell| shell.progress(plan.len() as u64, "Building"));

        let mut outcomes: Vec<BuildOutcome> = Vec::with_capacity(plan.len());
        for tier in plan.tiers() {
            tracing::info!("Dispatching tier {} ({} unit(s))", tier.order, tier.units.len());
            self.report(progress.as_ref(), Status::Tier, format!("{}", tier.order));

            // The pool call returns only after every unit of the tier finished.
            let finished: Vec<BuildOutcome> = pool.install(|| {
                tier.units
                    .par_iter()
                    .map(|unit| {
                        let outcome = self.build_unit(unit);
                        if let Some(progress) = &progress {
                            progress.inc(1);
                        }
                        outcome
                    })
                    .collect()
            });

            for outcome in &finished {
                self.report_outcome(progress.as_ref(), outcome);
            }

            let failed = finished.iter().any(|o| !o.is_success());
            outcomes.extend(finished);
            if failed {
                self.report(progress.as_ref(), Status::Aborted, "remaining tiers skipped");
                return Err(TierAborted::new(tier.order, outcomes).into());
            }
        }

        if let Some(progress) = &progress {
            progress.finish();
        }
        if let Some(shell) = &self.shell {
            shell.status(
                Status::Finished,
                format!(
                    "{} image(s) in {}",
                    outcomes.len(),
                    format_duration(start.elapsed())
                ),
            );
        }
        Ok(BuildReport { outcomes })
    }

    /// Build one unit. Never panics on failure; the error is in the outcome.
    pub fn build_unit(&self, unit: &BuildUnit) -> BuildOutcome {
        let start = Instant::now();
        tracing::debug!("Building {}", unit.tag());

        let result = self
            .check_inputs(unit)
            .and_then(|request| self.runtime.build_image(&request).map_err(|e| classify(unit, e)));

        if let Err(err) = &result {
            tracing::debug!("{} failed: {}", unit.id, err);
        }

        let keep_log = result.is_err() || self.options.save_logs;
        let saved_log = match &self.options.log_dir {
            Some(dir) if keep_log => save_log(unit, dir),
            _ => None,
        };

        BuildOutcome {
            unit: unit.clone(),
            result,
            duration: start.elapsed(),
            saved_log,
        }
    }

    fn check_inputs(&self, unit: &BuildUnit) -> Result<BuildRequest, BuildError> {
        if !unit.context_path.is_dir() {
            return Err(BuildError::Configuration {
                id: unit.id.clone(),
                message: format!("build context {} not found", unit.context_path.display()),
            });
        }
        if !unit.descriptor_path.is_file() {
            return Err(BuildError::Configuration {
                id: unit.id.clone(),
                message: format!("descriptor {} not found", unit.descriptor_path.display()),
            });
        }
        Ok(build_request(unit, &self.options))
    }

    fn report(&self, progress: Option<&Progress>, status: Status, msg: impl std::fmt::Display) {
        match (progress, &self.shell) {
            (Some(progress), _) => progress.println(status, msg),
            (None, Some(shell)) => shell.status(status, msg),
            (None, None) => {}
        }
    }

    fn report_outcome(&self, progress: Option<&Progress>, outcome: &BuildOutcome) {
        match &outcome.result {
            Ok(_) => self.report(
                progress,
                Status::Finished,
                format!("{} ({})", outcome.unit.tag(), format_duration(outcome.duration)),
            ),
            Err(err) => self.report(
                progress,
                Status::Failed,
                format!(
                    "{}, check {}\n{}",
                    outcome.unit.tag(),
                    outcome.log_location().display(),
                    indent(&err.to_string())
                ),
            ),
        }
    }
}

/// Request for building `unit`: version label and the standard build args.
pub fn build_request(unit: &BuildUnit, options: &SchedulerOptions) -> BuildRequest {
    let mut labels = BTreeMap::new();
    labels.insert(VERSION_LABEL.to_string(), unit.version.clone());

    let mut rel = relative_path(&unit.context_path, &unit.descriptor_dir())
        .to_string_lossy()
        .replace('\\', "/");
    if rel.is_empty() {
        rel.push('.');
    }

    let mut build_args = BTreeMap::new();
    build_args.insert("REGISTRY".to_string(), options.prefix.registry().to_string());
    build_args.insert("NAMESPACE".to_string(), options.prefix.namespace().to_string());
    build_args.insert("TAG".to_string(), format!(":{}", unit.version));
    build_args.insert("RELPATH".to_string(), format!("{}/", rel));

    BuildRequest {
        context: unit.context_path.clone(),
        descriptor: unit.descriptor_path.clone(),
        tag: unit.tag(),
        labels,
        build_args,
        platform: options.platform.clone(),
        log: unit.log_path.clone(),
    }
}

/// Translate a runtime failure into a build error.
///
/// A reference to a missing upstream image becomes [`BuildError::MissingSource`].
pub fn classify(unit: &BuildUnit, err: RuntimeError) -> BuildError {
    let message = match err {
        RuntimeError::BuildFailed { message } => message,
        other => other.to_string(),
    };
    match missing_image(&message) {
        Some(image) => BuildError::MissingSource { image },
        None => BuildError::Execution {
            id: unit.id.clone(),
            message: last_lines(&message, 5),
        },
    }
}

fn missing_image(message: &str) -> Option<String> {
    MISSING_IMAGE
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn save_log(unit: &BuildUnit, dir: &Path) -> Option<PathBuf> {
    if !unit.log_path.exists() {
        return None;
    }
    let dest = dir.join(format!("ignisbuild-{}.log", unit.id));
    match std::fs::copy(&unit.log_path, &dest) {
        Ok(_) => Some(dest),
        Err(e) => {
            tracing::warn!("failed to save log of {}: {}", unit.id, e);
            None
        }
    }
}

fn last_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

fn indent(s: &str) -> String {
    s.lines()
        .map(|l| format!("             {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply each extra tag to every produced image.
///
/// Returns the references created.
pub fn apply_version_tags(
    runtime: &dyn ContainerRuntime,
    images: &[(BuildUnit, ImageHandle)],
    tags: &[String],
) -> Result<Vec<String>> {
    let mut applied = Vec::new();
    for tag in tags {
        for (unit, image) in images {
            let reference = format!("{}:{}", unit.display_name, tag);
            runtime
                .tag_image(image, &reference)
                .with_context(|| format!("failed to tag {} as {}", unit.tag(), reference))?;
            applied.push(reference);
        }
    }
    Ok(applied)
}
