//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.ignis/config.toml` - User-wide defaults
//! - Project: `.ignis/config.toml` - Directory-specific overrides
//!
//! Project config takes precedence over global config, and command line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::image::DEFAULT_NAMESPACE;

/// Default name of the recipe directory inside a source tree.
pub const DEFAULT_RECIPE_DIR: &str = "Dockerfiles";

/// Default name of a build descriptor file.
pub const DEFAULT_DESCRIPTOR: &str = "Dockerfile";

/// Pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image naming
    pub registry: RegistryConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Push settings
    pub push: PushConfig,
}

/// Where images are named and published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry prefix, e.g. `registry.example.com:5000`
    pub url: Option<String>,

    /// Image namespace (default `ignishpc`)
    pub namespace: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker pool size (None = available parallelism)
    pub jobs: Option<usize>,

    /// Target platform(s), requires buildx
    pub platform: Option<String>,

    /// Always copy build logs next to the invocation
    pub save_logs: bool,

    /// Recipe folders to skip
    pub ignore: Vec<String>,

    /// Recipe directory name (default `Dockerfiles`)
    pub recipe_dir: Option<String>,

    /// Descriptor file name (default `Dockerfile`)
    pub descriptor: Option<String>,
}

/// Push-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Also push `*-builder` images
    pub builders: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.registry.url.is_some() {
            self.registry.url = other.registry.url;
        }
        if other.registry.namespace.is_some() {
            self.registry.namespace = other.registry.namespace;
        }

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.platform.is_some() {
            self.build.platform = other.build.platform;
        }
        if other.build.save_logs {
            self.build.save_logs = true;
        }
        if !other.build.ignore.is_empty() {
            self.build.ignore = other.build.ignore;
        }
        if other.build.recipe_dir.is_some() {
            self.build.recipe_dir = other.build.recipe_dir;
        }
        if other.build.descriptor.is_some() {
            self.build.descriptor = other.build.descriptor;
        }

        if other.push.builders {
            self.push.builders = true;
        }
    }

    /// Configured namespace or the default one.
    pub fn namespace(&self) -> &str {
        self.registry.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn recipe_dir(&self) -> &str {
        self.build.recipe_dir.as_deref().unwrap_or(DEFAULT_RECIPE_DIR)
    }

    pub fn descriptor(&self) -> &str {
        self.build.descriptor.as_deref().unwrap_or(DEFAULT_DESCRIPTOR)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ignis/config.toml)
/// 2. Global config (~/.ignis/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.ignis).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ignis"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.registry.url.is_none());
        assert_eq!(config.namespace(), "ignishpc");
        assert_eq!(config.recipe_dir(), "Dockerfiles");
        assert_eq!(config.descriptor(), "Dockerfile");
        assert!(!config.push.builders);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[registry]
url = "registry.local:5000"
namespace = "team"

[build]
jobs = 8
platform = "linux/amd64"
ignore = ["docs"]

[push]
builders = true
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.registry.url.as_deref(), Some("registry.local:5000"));
        assert_eq!(config.namespace(), "team");
        assert_eq!(config.build.jobs, Some(8));
        assert_eq!(config.build.platform.as_deref(), Some("linux/amd64"));
        assert_eq!(config.build.ignore, vec!["docs"]);
        assert!(config.push.builders);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.registry.namespace = Some("base".to_string());
        base.build.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.registry.namespace = Some("project".to_string());

        base.merge(override_cfg);

        assert_eq!(base.namespace(), "project");
        assert_eq!(base.build.jobs, Some(4));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[registry]\nurl = \"global:5000\"\n[build]\njobs = 2\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[registry]\nurl = \"project:5000\"\n").unwrap();

        let config = load_config(&global_path, &project_path);
        assert_eq!(config.registry.url.as_deref(), Some("project:5000"));
        assert_eq!(config.build.jobs, Some(2));
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build\njobs = ").unwrap();

        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(&path);
        assert!(config.build.jobs.is_none());
    }
}
