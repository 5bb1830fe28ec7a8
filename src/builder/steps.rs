//! Per-module build steps and their outcomes.
//!
//! A step never aborts the build. Whatever happens is recorded as a
//! [`StepOutcome`] and the builder moves on to the next step.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// The three steps run for every module, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Remove an artifact left by a previous build.
    CleanStale,
    /// Run the compiler front-end.
    Compile,
    /// Remove the debug-symbol bundle the toolchain leaves behind.
    CleanDebugBundle,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::CleanStale => "clean-stale",
            StepKind::Compile => "compile",
            StepKind::CleanDebugBundle => "clean-debug-bundle",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step failed.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("module directory `{}` does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("source file `{}` does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with {}", exit_code_display(.code))]
    ExitStatus {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0}")]
    Io(String),
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl StepError {
    /// Captured compiler stderr, when the failure came from a finished process.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            StepError::ExitStatus { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// What a step did.
#[derive(Debug, Clone)]
pub enum StepStatus {
    /// The step ran and did its work. Carries the paths it removed or produced.
    Done(Vec<PathBuf>),
    /// Nothing to do, e.g. no stale artifact to remove.
    Skipped,
    /// The step failed; the build continued.
    Failed(StepError),
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Done(_) => "done",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed(_) => "failed",
        }
    }
}

/// The outcome of a single step for one module.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub status: StepStatus,
    pub duration: Duration,
}

impl StepOutcome {
    pub fn new(kind: StepKind, status: StepStatus, duration: Duration) -> Self {
        StepOutcome {
            kind,
            status,
            duration,
        }
    }
}
