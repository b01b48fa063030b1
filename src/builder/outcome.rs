//! Build outcomes and run reports.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::{BuildError, BuildUnit};
use crate::runtime::ImageHandle;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result of executing one unit. Immutable once created.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub unit: BuildUnit,
    pub result: Result<ImageHandle, BuildError>,
    pub duration: Duration,
    /// Copy of the log kept next to the invocation
    pub saved_log: Option<PathBuf>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.result.as_ref().err()
    }

    /// Where the log can be read after the workspace is gone.
    pub fn log_location(&self) -> &Path {
        self.saved_log.as_deref().unwrap_or(&self.unit.log_path)
    }
}

/// Outcomes of a run in which every tier succeeded.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub outcomes: Vec<BuildOutcome>,
}

impl BuildReport {
    /// Units with their produced images.
    pub fn images(&self) -> impl Iterator<Item = (&BuildUnit, &ImageHandle)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.image().map(|img| (&o.unit, img)))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// A tier finished with failures; later tiers were never dispatched.
///
/// Holds every outcome of the tiers that ran, successes included.
#[derive(Debug, Clone, Error)]
#[error("build aborted at tier {tier}: {failed} unit(s) failed")]
pub struct TierAborted {
    pub tier: u32,
    pub failed: usize,
    pub outcomes: Vec<BuildOutcome>,
}

impl TierAborted {
    pub fn new(tier: u32, outcomes: Vec<BuildOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        TierAborted {
            tier,
            failed,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn successes(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Convert to a user-friendly diagnostic listing every failed unit.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        for outcome in self.failures() {
            if let Some(err) = outcome.error() {
                diag = diag.with_context(format!(
                    "{}: {} (log: {})",
                    outcome.unit.id,
                    first_line(&err.to_string()),
                    outcome.log_location().display()
                ));
            }
        }
        let built = self.successes().count();
        if built > 0 {
            diag = diag.with_context(format!("{} unit(s) built before the abort", built));
        }
        diag.with_suggestion(suggestions::TIER_ABORTED)
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or(s)
}
