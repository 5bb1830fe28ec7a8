//! f2build - build Fortran sources into Python extension modules
//!
//! This crate provides the library behind the `f2build` command: module
//! descriptors, the extension builder that drives the compiler front-end,
//! and the verification pass that reports which modules compiled.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use builder::{BuildReport, ExtensionBuilder, RuntimeInfo, Toolchain};
pub use core::{Manifest, ModuleDescriptor};
pub use util::context::GlobalContext;
