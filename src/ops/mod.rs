//! High-level operations behind each command.

pub mod doctor;
pub mod f2build_build;
pub mod f2build_clean;
pub mod verify;

pub use doctor::{doctor, format_report, CheckResult, DoctorReport};
pub use f2build_build::{build, verify_project, BuildOptions, BuildOutcome};
pub use f2build_clean::{clean, CleanOptions, CleanReport};
pub use verify::{format_summary, verify, ModuleCheck, VerifyReport};
