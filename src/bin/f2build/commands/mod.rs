//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod doctor;
pub mod verify;

use anyhow::{bail, Result};

use f2build::ops::{format_summary, BuildOutcome};
use f2build::util::Shell;

/// Print the verification report and apply `--strict`.
pub fn finish(outcome: &BuildOutcome, shell: &Shell) -> Result<()> {
    if shell.is_json() {
        shell.json_event(&outcome.verify.to_event().to_value());
    } else {
        print!("{}", format_summary(&outcome.verify));
    }

    if outcome.should_fail() {
        bail!(
            "{} of {} module(s) did not build",
            outcome.verify.missing_count(),
            outcome.verify.checks.len()
        );
    }

    Ok(())
}
