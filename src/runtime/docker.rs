//! Container runtime backed by the `docker` command line client.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::runtime::{
    BuildRequest, ContainerInfo, ContainerRuntime, ContainerSpec, ImageFilter, ImageHandle,
    ImageSummary, RuntimeError,
};
use crate::util::fs::write_string;
use crate::util::process::{find_executable, ProcessBuilder};

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\x1b\\[[0-9;]*m").expect("valid regex"));

/// Docker CLI client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl DockerCli {
    /// Use the `docker` executable found in PATH.
    pub fn new() -> Self {
        let program = find_executable("docker").unwrap_or_else(|| PathBuf::from("docker"));
        DockerCli { program }
    }

    /// Use a specific client executable.
    pub fn with_program(program: impl AsRef<Path>) -> Self {
        DockerCli {
            program: program.as_ref().to_path_buf(),
        }
    }

    fn command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
    }

    /// Run a command and return its stdout, mapping failures to runtime errors.
    fn run(&self, cmd: ProcessBuilder) -> Result<String, RuntimeError> {
        let output = cmd.exec().map_err(|e| RuntimeError::Spawn {
            command: cmd.display_command(),
            message: format!("{:#}", e),
        })?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn build_command(&self, request: &BuildRequest, iidfile: &Path) -> ProcessBuilder {
        let mut cmd = self.command();
        cmd = match request.platform {
            Some(ref platform) => cmd
                .args(["buildx", "build", "--load", "--platform"])
                .arg(platform),
            None => cmd.arg("build"),
        };
        cmd = cmd
            .arg("-f")
            .arg(&request.descriptor)
            .arg("-t")
            .arg(&request.tag)
            .arg("--iidfile")
            .arg(iidfile);
        for (key, value) in &request.labels {
            cmd = cmd.arg("--label").arg(format!("{}={}", key, value));
        }
        for (key, value) in &request.build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        cmd.arg(&request.context)
    }

    fn image_id(&self, iidfile: &Path, tag: &str) -> Result<ImageHandle, RuntimeError> {
        if let Ok(id) = std::fs::read_to_string(iidfile) {
            let id = id.trim();
            if !id.is_empty() {
                return Ok(ImageHandle::new(id));
            }
        }
        let out = self.run(
            self.command()
                .args(["image", "inspect", "--format", "{{.Id}}"])
                .arg(tag),
        )?;
        Ok(ImageHandle::new(out.trim()))
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        DockerCli::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspect {
    id: String,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    created: String,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerInspect {
    name: String,
    config: ContainerConfig,
    state: ContainerState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig {
    image: String,
    #[serde(default)]
    labels: Option<std::collections::BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerState {
    status: String,
}

fn parse_images(json: &str) -> Result<Vec<ImageSummary>, RuntimeError> {
    let raw: Vec<ImageInspect> =
        serde_json::from_str(json).map_err(|e| RuntimeError::Parse(e.to_string()))?;
    raw.into_iter()
        .map(|img| {
            let created = DateTime::parse_from_rfc3339(&img.created)
                .map_err(|e| RuntimeError::Parse(format!("{}: {}", img.created, e)))?
                .with_timezone(&Utc);
            Ok(ImageSummary {
                id: img.id,
                tags: img.repo_tags.unwrap_or_default(),
                created,
                parent: img.parent.filter(|p| !p.is_empty()),
            })
        })
        .collect()
}

fn parse_container(json: &str) -> Result<Option<ContainerInfo>, RuntimeError> {
    let raw: Vec<ContainerInspect> =
        serde_json::from_str(json).map_err(|e| RuntimeError::Parse(e.to_string()))?;
    Ok(raw.into_iter().next().map(|c| ContainerInfo {
        name: c.name.trim_start_matches('/').to_string(),
        image: c.config.image,
        state: c.state.status,
        labels: c.config.labels.unwrap_or_default(),
    }))
}

/// A push progress line announcing failure.
fn is_push_error(line: &str) -> bool {
    let line = line.trim_start();
    line.get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("error"))
        || line.contains("errorDetail")
}

/// Remove ANSI color codes from build output.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

impl ContainerRuntime for DockerCli {
    fn build_image(&self, request: &BuildRequest) -> Result<ImageHandle, RuntimeError> {
        let iidfile = request.log.with_extension("iid");
        let cmd = self.build_command(request, &iidfile);
        let output = cmd.exec().map_err(|e| RuntimeError::Spawn {
            command: cmd.display_command(),
            message: format!("{:#}", e),
        })?;

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));
        let log = strip_ansi(&log);
        if let Err(e) = write_string(&request.log, &log) {
            tracing::warn!("cannot write build log: {:#}", e);
        }

        if !output.status.success() {
            return Err(RuntimeError::BuildFailed { message: log });
        }
        self.image_id(&iidfile, &request.tag)
    }

    fn tag_image(&self, image: &ImageHandle, new_tag: &str) -> Result<(), RuntimeError> {
        self.run(self.command().arg("tag").arg(&image.id).arg(new_tag))
            .map(|_| ())
    }

    fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ImageSummary>, RuntimeError> {
        let mut cmd = self.command().args(["image", "ls", "-q", "--no-trunc"]);
        if filter.all {
            cmd = cmd.arg("--all");
        }
        if let Some(ref label) = filter.label {
            cmd = cmd.arg("--filter").arg(format!("label={}", label));
        }
        if let Some(ref reference) = filter.reference {
            cmd = cmd.arg(reference);
        }

        let mut ids: Vec<String> = self
            .run(cmd)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let json = self.run(self.command().args(["image", "inspect"]).args(&ids))?;
        parse_images(&json)
    }

    fn remove_image(&self, reference: &str, force: bool) -> Result<(), RuntimeError> {
        let mut cmd = self.command().args(["image", "rm"]);
        if force {
            cmd = cmd.arg("-f");
        }
        self.run(cmd.arg(reference)).map(|_| ())
    }

    fn push_image(
        &self,
        tag: &str,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), RuntimeError> {
        let cmd = self.command().arg("push").arg(tag);
        let mut reported: Option<String> = None;
        let result = cmd.exec_streaming(|line| {
            progress(line);
            if is_push_error(line) {
                reported = Some(strip_ansi(line.trim()));
                anyhow::bail!("push of `{}` reported an error", tag);
            }
            Ok(())
        });
        if let Some(message) = reported {
            return Err(RuntimeError::PushFailed {
                tag: tag.to_string(),
                message,
            });
        }
        let out = result.map_err(|e| RuntimeError::Spawn {
            command: cmd.display_command(),
            message: format!("{:#}", e),
        })?;
        if !out.status.success() {
            return Err(RuntimeError::PushFailed {
                tag: tag.to_string(),
                message: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn run_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut cmd = self.command().args(["run", "-d", "--name"]).arg(&spec.name);
        for (key, value) in &spec.env {
            cmd = cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        for (host, container) in &spec.mounts {
            cmd = cmd
                .arg("-v")
                .arg(format!("{}:{}", host.display(), container.display()));
        }
        for (host, container) in &spec.ports {
            cmd = cmd.arg("-p").arg(format!("{}:{}", host, container));
        }
        for (key, value) in &spec.labels {
            cmd = cmd.arg("--label").arg(format!("{}={}", key, value));
        }
        let id = self.run(cmd.arg(&spec.image))?;
        Ok(id.trim().to_string())
    }

    fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(self.command().arg("stop").arg(name)).map(|_| ())
    }

    fn remove_container(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        let mut cmd = self.command().arg("rm");
        if force {
            cmd = cmd.arg("-f");
        }
        self.run(cmd.arg(name)).map(|_| ())
    }

    fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, RuntimeError> {
        match self.run(self.command().args(["container", "inspect"]).arg(name)) {
            Ok(json) => parse_container(&json),
            Err(RuntimeError::CommandFailed { message }) if message.contains("No such") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
