//! Core data model: module descriptors and the project manifest.

pub mod descriptor;
pub mod manifest;

pub use descriptor::ModuleDescriptor;
pub use manifest::{Manifest, ManifestError};
