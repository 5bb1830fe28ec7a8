//! Build event types for JSON output.
//!
//! These events are emitted, one JSON object per line on stdout, when using
//! `--message-format json`.
//!
//! # Event Types
//!
//! - `module-step`: One step finished for one module
//! - `module-finished`: All steps finished for one module
//! - `build-finished`: Every module was processed
//! - `verify-finished`: Verification pass result, one entry per module
//!
//! # Stability
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::steps::{StepKind, StepOutcome, StepStatus};

/// A build event emitted during the build process.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// One step finished for a module.
    #[serde(rename = "module-step")]
    ModuleStep {
        module: String,
        step: StepKind,
        /// "done", "skipped" or "failed"
        status: &'static str,
        /// Files or directories the step removed or produced
        #[serde(skip_serializing_if = "Vec::is_empty")]
        paths: Vec<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        duration_ms: u64,
    },

    /// All steps finished for a module.
    #[serde(rename = "module-finished")]
    ModuleFinished {
        module: String,
        directory: PathBuf,
        /// Whether every step succeeded or was skipped
        success: bool,
    },

    /// Build completed.
    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        duration_ms: u64,
        modules: u64,
        failed: u64,
    },

    /// Verification pass completed.
    #[serde(rename = "verify-finished")]
    VerifyFinished {
        #[serde(skip_serializing_if = "Option::is_none")]
        python_version: Option<String>,
        ext_suffix: String,
        modules: Vec<VerifiedModule>,
    },
}

/// One line of the verification report.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedModule {
    pub module: String,
    pub artifact: PathBuf,
    pub present: bool,
}

impl BuildEvent {
    /// Create a step event from its outcome.
    pub fn step(module: impl Into<String>, outcome: &StepOutcome) -> Self {
        let (paths, message, stderr) = match &outcome.status {
            StepStatus::Done(paths) => (paths.clone(), None, None),
            StepStatus::Skipped => (Vec::new(), None, None),
            StepStatus::Failed(err) => (
                Vec::new(),
                Some(err.to_string()),
                err.stderr().map(str::to_string),
            ),
        };

        BuildEvent::ModuleStep {
            module: module.into(),
            step: outcome.kind,
            status: outcome.status.label(),
            paths,
            message,
            stderr,
            duration_ms: outcome.duration.as_millis() as u64,
        }
    }

    /// Create a build finished event.
    pub fn finished(modules: u64, failed: u64, duration_ms: u64) -> Self {
        BuildEvent::BuildFinished {
            success: failed == 0,
            duration_ms,
            modules,
            failed,
        }
    }

    /// Serialize this event to a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
