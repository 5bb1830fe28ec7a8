//! Extension module build.
//!
//! This module drives the compiler front-end for each module and records
//! what every step did.

pub mod events;
pub mod extension;
pub mod runtime;
pub mod steps;
pub mod toolchain;

pub use events::BuildEvent;
pub use extension::{BuildReport, ExtensionBuilder, ModuleBuild};
pub use runtime::{resolve_runtime, RuntimeInfo};
pub use steps::{StepError, StepKind, StepOutcome, StepStatus};
pub use toolchain::{detect_toolchain, Toolchain};
