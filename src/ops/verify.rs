//! Verification pass.
//!
//! Checks whether `<name><ext_suffix>` exists for each module and renders
//! the summary report:
//!
//! ```text
//!
//! Summary
//! -------
//!
//! Check whether the fortran files have compiled.
//!
//! Python version = 3
//!
//! utility_random_walk ... Yes
//! utility_mst ... No
//! ```

use std::fmt::Write;
use std::path::PathBuf;

use crate::builder::events::{BuildEvent, VerifiedModule};
use crate::builder::runtime::RuntimeInfo;
use crate::core::ModuleDescriptor;

/// Presence check for one module.
#[derive(Debug, Clone)]
pub struct ModuleCheck {
    pub module: ModuleDescriptor,
    pub artifact: PathBuf,
    pub present: bool,
}

/// Result of the verification pass.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub runtime: RuntimeInfo,
    pub checks: Vec<ModuleCheck>,
}

impl VerifyReport {
    pub fn all_present(&self) -> bool {
        self.checks.iter().all(|c| c.present)
    }

    pub fn missing_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.present).count()
    }

    /// JSON event for `--message-format json`.
    pub fn to_event(&self) -> BuildEvent {
        BuildEvent::VerifyFinished {
            python_version: self.runtime.version.map(|v| v.to_string()),
            ext_suffix: self.runtime.ext_suffix.clone(),
            modules: self
                .checks
                .iter()
                .map(|c| VerifiedModule {
                    module: c.module.base_name.clone(),
                    artifact: c.artifact.clone(),
                    present: c.present,
                })
                .collect(),
        }
    }
}

/// Check each module's artifact, in module order.
pub fn verify(modules: &[ModuleDescriptor], runtime: &RuntimeInfo) -> VerifyReport {
    let checks = modules
        .iter()
        .map(|module| {
            let artifact = module.artifact_path(&runtime.ext_suffix);
            let present = artifact.is_file();
            tracing::debug!(
                "{}: {} {}",
                module.base_name,
                artifact.display(),
                if present { "found" } else { "missing" }
            );
            ModuleCheck {
                module: module.clone(),
                artifact,
                present,
            }
        })
        .collect();

    VerifyReport {
        runtime: runtime.clone(),
        checks,
    }
}

/// Render the summary report printed to stdout.
pub fn format_summary(report: &VerifyReport) -> String {
    let mut output = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(output);
    let _ = writeln!(output, "Summary");
    let _ = writeln!(output, "-------\n");
    let _ = writeln!(output, "Check whether the fortran files have compiled.\n");
    let _ = writeln!(
        output,
        "Python version = {}\n",
        report.runtime.major_version_label()
    );

    for check in &report.checks {
        let answer = if check.present { "Yes" } else { "No" };
        let _ = writeln!(output, "{} ... {}", check.module.base_name, answer);
    }

    output
}
