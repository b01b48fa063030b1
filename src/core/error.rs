//! Pipeline error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fatal errors raised before any build is dispatched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("`{id}` is already defined")]
    DuplicateUnit {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("`{tree}` has no version `{requested}`")]
    VersionNotFound {
        tree: String,
        requested: String,
        available: Vec<String>,
    },

    #[error("invalid version filter `{0}`, expected NAME=VERSION")]
    InvalidVersionFilter(String),

    #[error("invalid custom image `{0}`, expected NAME=COMPONENT[,COMPONENT...]")]
    InvalidCustomImage(String),

    #[error("invalid order marker {path}: `{value}` is not an integer")]
    InvalidOrder { path: PathBuf, value: String },

    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to fetch `{url}`: {message}")]
    FetchFailed { url: String, message: String },
}

impl PipelineError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PipelineError::DuplicateUnit { id, first, second } => {
                Diagnostic::error(format!("build unit `{}` is defined twice", id))
                    .with_context(format!("first defined in {}", first.display()))
                    .with_context(format!("redefined in {}", second.display()))
                    .with_suggestion("Rename one of the recipe folders")
                    .with_suggestion("Use --ignore to skip one of the folders")
            }

            PipelineError::VersionNotFound {
                tree,
                requested,
                available,
            } => {
                let mut diag =
                    Diagnostic::error(format!("`{}` has no version `{}`", tree, requested));
                if !available.is_empty() {
                    diag = diag.with_context(format!("available tags: {}", available.join(", ")));
                }
                diag.with_suggestion(format!(
                    "Use --version-filter {}=<version> with an existing tag",
                    tree
                ))
            }

            PipelineError::InvalidVersionFilter(_) | PipelineError::InvalidCustomImage(_) => {
                Diagnostic::error(self.to_string())
            }

            PipelineError::InvalidOrder { path, .. } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion("The order file must contain a single integer"),

            PipelineError::SourceNotFound { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Check the path passed to --local-sources"),

            PipelineError::FetchFailed { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::FETCH_FAILED)
            }
        }
    }
}

/// Failure of a single unit build.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum BuildError {
    /// The unit's descriptor or context is unusable.
    #[error("invalid build unit `{id}`: {message}")]
    #[diagnostic(code(ignis::build::configuration))]
    Configuration { id: String, message: String },

    /// An upstream image referenced by the descriptor does not exist.
    #[error("{image} required, use --sources or --local-sources to add its Dockerfile")]
    #[diagnostic(
        code(ignis::build::missing_source),
        help("Supply the component that builds `{image}` as a remote or local source")
    )]
    MissingSource { image: String },

    /// The runtime failed while building.
    #[error("build of `{id}` failed: {message}")]
    #[diagnostic(code(ignis::build::execution))]
    Execution { id: String, message: String },
}

impl BuildError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self, log: Option<&PathBuf>) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(log) = log {
            diag = diag.with_context(format!("check {}", log.display()));
        }
        match self {
            BuildError::MissingSource { image } => diag.with_suggestion(format!(
                "Add the source that provides `{}` with --sources or --local-sources",
                image
            )),
            BuildError::Configuration { .. } => diag,
            BuildError::Execution { .. } => diag.with_suggestion(suggestions::BUILD_FAILED),
        }
    }
}
