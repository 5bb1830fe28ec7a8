//! `F2build.toml` manifest.
//!
//! The manifest is optional. Without one the default module list is used.
//!
//! ```toml
//! base = "mistree"
//!
//! [[module]]
//! dir = "levy_flight"
//! name = "utility_random_walk"
//! ```

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::descriptor::{
    is_valid_module_name, ModuleDescriptor, DEFAULT_BASE_DIR, DEFAULT_MODULES,
};

/// Manifest file name.
pub const MANIFEST_NAME: &str = "F2build.toml";

/// Errors loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest `{}`: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid module name `{name}` in `{}`", .path.display())]
    InvalidName { path: PathBuf, name: String },

    #[error("`{field}` = `{}` in `{}` must be a relative path inside the project", .value.display(), .path.display())]
    EscapingPath {
        path: PathBuf,
        field: &'static str,
        value: PathBuf,
    },

    #[error("module `{name}` in directory `{dir}` is listed more than once")]
    Duplicate { dir: String, name: String },

    #[error("no modules listed in `{}`", .path.display())]
    Empty { path: PathBuf },
}

/// A module entry as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Directory relative to `base`
    pub dir: PathBuf,
    /// Module base name
    pub name: String,
}

/// Parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Directory, relative to the manifest, that module directories are relative to
    #[serde(default = "default_base")]
    pub base: PathBuf,

    /// Modules in build order
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
}

fn default_base() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            base: default_base(),
            modules: DEFAULT_MODULES
                .iter()
                .map(|(dir, name)| ModuleEntry {
                    dir: PathBuf::from(dir),
                    name: name.to_string(),
                })
                .collect(),
        }
    }
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse and validate manifest content. `path` is used for messages only.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), ManifestError> {
        if self.modules.is_empty() {
            return Err(ManifestError::Empty {
                path: path.to_path_buf(),
            });
        }

        check_contained(path, "base", &self.base)?;

        let mut seen = HashSet::new();
        for entry in &self.modules {
            check_contained(path, "dir", &entry.dir)?;
            if !is_valid_module_name(&entry.name) {
                return Err(ManifestError::InvalidName {
                    path: path.to_path_buf(),
                    name: entry.name.clone(),
                });
            }
            if !seen.insert((entry.dir.clone(), entry.name.clone())) {
                return Err(ManifestError::Duplicate {
                    dir: entry.dir.display().to_string(),
                    name: entry.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Resolve entries into descriptors rooted at `project_root`.
    pub fn descriptors(&self, project_root: &Path) -> Vec<ModuleDescriptor> {
        let base = project_root.join(&self.base);
        self.modules
            .iter()
            .map(|entry| ModuleDescriptor::new(&entry.dir, entry.name.clone()).rebased(&base))
            .collect()
    }
}

/// `value` may only descend: no root, drive prefix or `..`.
fn check_contained(path: &Path, field: &'static str, value: &Path) -> Result<(), ManifestError> {
    let escapes = value.components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes {
        return Err(ManifestError::EscapingPath {
            path: path.to_path_buf(),
            field,
            value: value.to_path_buf(),
        });
    }
    Ok(())
}

/// Look for a manifest in `dir`.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(MANIFEST_NAME);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_matches_default_modules() {
        let manifest = Manifest::default();
        let from_manifest = manifest.descriptors(Path::new("/proj"));
        let defaults = crate::core::descriptor::default_modules(Path::new("/proj"));
        assert_eq!(from_manifest, defaults);
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(
            r#"
base = "src/fortran"

[[module]]
dir = "walk"
name = "random_walk"

[[module]]
dir = "graph"
name = "spanning_tree"
"#,
            Path::new("F2build.toml"),
        )
        .unwrap();

        assert_eq!(manifest.base, PathBuf::from("src/fortran"));
        let descriptors = manifest.descriptors(Path::new("/proj"));
        assert_eq!(descriptors.len(), 2);
        assert_eq!(
            descriptors[0].directory,
            PathBuf::from("/proj/src/fortran/walk")
        );
        assert_eq!(descriptors[1].base_name, "spanning_tree");
    }

    #[test]
    fn test_base_defaults_to_mistree() {
        let manifest = Manifest::parse(
            "[[module]]\ndir = \"mst\"\nname = \"utility_mst\"\n",
            Path::new("F2build.toml"),
        )
        .unwrap();
        assert_eq!(manifest.base, PathBuf::from("mistree"));
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let err = Manifest::parse("base = \"mistree\"\n", Path::new("F2build.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Empty { .. }));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = Manifest::parse(
            "[[module]]\ndir = \"mst\"\nname = \"utility-mst\"\n",
            Path::new("F2build.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName { name, .. } if name == "utility-mst"));
    }

    #[test]
    fn test_escaping_dir_rejected() {
        for dir in ["/etc", "../outside", "mst/../../outside"] {
            let content = format!("[[module]]\ndir = \"{}\"\nname = \"utility_mst\"\n", dir);
            let err = Manifest::parse(&content, Path::new("F2build.toml")).unwrap_err();
            assert!(
                matches!(err, ManifestError::EscapingPath { field: "dir", .. }),
                "{} was accepted",
                dir
            );
        }
    }

    #[test]
    fn test_escaping_base_rejected() {
        let err = Manifest::parse(
            "base = \"..\"\n[[module]]\ndir = \"mst\"\nname = \"utility_mst\"\n",
            Path::new("F2build.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EscapingPath { field: "base", .. }));
        assert!(err.to_string().contains("`base` = `..`"));
    }

    #[test]
    fn test_current_dir_allowed() {
        let manifest = Manifest::parse(
            "base = \".\"\n[[module]]\ndir = \"./mst\"\nname = \"utility_mst\"\n",
            Path::new("F2build.toml"),
        );
        assert!(manifest.is_ok());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = Manifest::parse(
            r#"
[[module]]
dir = "mst"
name = "utility_mst"

[[module]]
dir = "mst"
name = "utility_mst"
"#,
            Path::new("F2build.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Duplicate { .. }));
    }

    #[test]
    fn test_same_name_in_different_dirs_allowed() {
        let manifest = Manifest::parse(
            r#"
[[module]]
dir = "a"
name = "utility"

[[module]]
dir = "b"
name = "utility"
"#,
            Path::new("F2build.toml"),
        );
        assert!(manifest.is_ok());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Manifest::parse("[[module]\n", Path::new("/proj/F2build.toml")).unwrap_err();
        assert!(err.to_string().contains("/proj/F2build.toml"));
    }

    #[test]
    fn test_find_manifest() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(find_manifest(tmp.path()).is_none());

        std::fs::write(tmp.path().join(MANIFEST_NAME), "").unwrap();
        assert_eq!(
            find_manifest(tmp.path()),
            Some(tmp.path().join(MANIFEST_NAME))
        );
    }
}
