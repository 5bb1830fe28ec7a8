//! Module descriptors.
//!
//! A descriptor names one compilation unit: a directory holding
//! `<base_name>.f90` and receiving the built extension module. Every path a
//! build step touches is derived here by joining onto the directory.

use std::fmt;
use std::path::{Path, PathBuf};

/// Directory, relative to the project root, that descriptor directories are
/// resolved against when no manifest says otherwise.
pub const DEFAULT_BASE_DIR: &str = "mistree";

/// The modules built when the project has no manifest, in build order.
pub const DEFAULT_MODULES: &[(&str, &str)] = &[
    ("levy_flight", "utility_random_walk"),
    ("mst", "utility_mst"),
    ("mst", "utility_density"),
];

/// Suffix of the Fortran source file.
pub const SOURCE_EXTENSION: &str = ".f90";

/// Artifact name removed before every build regardless of host platform.
pub const STALE_ARTIFACT_SUFFIX: &str = ".so";

/// Debug-symbol bundle left next to the artifact by the toolchain on macOS.
pub const DEBUG_BUNDLE_SUFFIX: &str = ".so.dSYM";

/// One compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDescriptor {
    /// Directory containing the source; the compiler runs here.
    pub directory: PathBuf,
    /// Module name, used for the source file and the built artifact.
    pub base_name: String,
}

impl ModuleDescriptor {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        ModuleDescriptor {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }

    /// File name of the Fortran source, e.g. `utility_mst.f90`.
    pub fn source_file_name(&self) -> String {
        format!("{}{}", self.base_name, SOURCE_EXTENSION)
    }

    /// `<directory>/<base_name>.f90`
    pub fn source_path(&self) -> PathBuf {
        self.directory.join(self.source_file_name())
    }

    /// `<directory>/<base_name>.so`
    pub fn stale_artifact_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.base_name, STALE_ARTIFACT_SUFFIX))
    }

    /// `<directory>/<base_name>.so.dSYM`
    pub fn debug_bundle_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.base_name, DEBUG_BUNDLE_SUFFIX))
    }

    /// `<directory>/<base_name><ext_suffix>`
    pub fn artifact_path(&self, ext_suffix: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.base_name, ext_suffix))
    }

    /// Return a copy with the directory resolved against `base`.
    pub fn rebased(&self, base: &Path) -> Self {
        ModuleDescriptor {
            directory: base.join(&self.directory),
            base_name: self.base_name.clone(),
        }
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_name)
    }
}

/// The default module list, resolved against `<project_root>/mistree`.
pub fn default_modules(project_root: &Path) -> Vec<ModuleDescriptor> {
    let base = project_root.join(DEFAULT_BASE_DIR);
    DEFAULT_MODULES
        .iter()
        .map(|(dir, name)| ModuleDescriptor::new(base.join(dir), *name))
        .collect()
}

/// Check that a module name can be used as both a file stem and an import name.
pub fn is_valid_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
