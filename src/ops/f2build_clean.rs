//! Remove built extension modules and debug bundles.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::runtime::validate_ext_suffix;
use crate::core::ModuleDescriptor;
use crate::util::fs::{glob_files, remove_dir_all_if_exists, remove_file_if_exists};

/// Options for `clean`.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Also remove artifacts built for other interpreters (`<name>.*.so`, `<name>.*.pyd`)
    pub all: bool,
}

/// Paths removed by `clean`, in module order.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    /// Modules whose directory does not exist
    pub skipped: Vec<ModuleDescriptor>,
}

/// Remove `<name>.so`, `<name><ext_suffix>` and `<name>.so.dSYM` for each module.
///
/// Modules whose directory does not exist are skipped. Errors before
/// touching anything if `ext_suffix` fails [`validate_ext_suffix`].
pub fn clean(
    modules: &[ModuleDescriptor],
    ext_suffix: &str,
    options: &CleanOptions,
) -> Result<CleanReport> {
    validate_ext_suffix(ext_suffix)?;
    let mut report = CleanReport::default();

    for module in modules {
        if !module.directory.is_dir() {
            report.skipped.push(module.clone());
            continue;
        }

        let mut files = vec![module.stale_artifact_path(), module.artifact_path(ext_suffix)];
        if options.all {
            let patterns = [
                format!("{}.*.so", glob::Pattern::escape(&module.base_name)),
                format!("{}.*.pyd", glob::Pattern::escape(&module.base_name)),
            ];
            files.extend(glob_files(&module.directory, &patterns)?);
        }
        files.sort();
        files.dedup();

        for file in files {
            if remove_file_if_exists(&file)? {
                report.removed.push(file);
            }
        }

        let bundle = module.debug_bundle_path();
        if remove_dir_all_if_exists(&bundle)? {
            report.removed.push(bundle);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn module_with_outputs(dir: &std::path::Path) -> ModuleDescriptor {
        let module = ModuleDescriptor::new(dir, "utility_mst");
        fs::write(module.source_path(), "").unwrap();
        fs::write(module.stale_artifact_path(), "").unwrap();
        fs::write(module.artifact_path(".cpython-311-x86_64-linux-gnu.so"), "").unwrap();
        fs::write(module.artifact_path(".cpython-312-x86_64-linux-gnu.so"), "").unwrap();
        fs::create_dir_all(module.debug_bundle_path().join("Contents")).unwrap();
        module
    }

    #[test]
    fn test_clean_removes_current_outputs() {
        let tmp = TempDir::new().unwrap();
        let module = module_with_outputs(tmp.path());

        let report = clean(
            std::slice::from_ref(&module),
            ".cpython-311-x86_64-linux-gnu.so",
            &CleanOptions::default(),
        )
        .unwrap();

        assert_eq!(report.removed.len(), 3);
        assert!(module.source_path().exists());
        assert!(module
            .artifact_path(".cpython-312-x86_64-linux-gnu.so")
            .exists());
        assert!(!module.debug_bundle_path().exists());
    }

    #[test]
    fn test_clean_all_removes_other_interpreters() {
        let tmp = TempDir::new().unwrap();
        let module = module_with_outputs(tmp.path());

        let report = clean(
            std::slice::from_ref(&module),
            ".so",
            &CleanOptions { all: true },
        )
        .unwrap();

        assert_eq!(report.removed.len(), 4);
        assert!(module.source_path().exists());
        assert!(!module
            .artifact_path(".cpython-312-x86_64-linux-gnu.so")
            .exists());
    }

    #[test]
    fn test_clean_skips_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let module = ModuleDescriptor::new(tmp.path().join("absent"), "utility_mst");

        let report = clean(&[module], ".so", &CleanOptions { all: true }).unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].base_name, "utility_mst");
    }

    #[test]
    fn test_clean_rejects_source_extension_as_suffix() {
        let tmp = TempDir::new().unwrap();
        let module = module_with_outputs(tmp.path());

        assert!(clean(std::slice::from_ref(&module), ".f90", &CleanOptions::default()).is_err());
        assert!(clean(std::slice::from_ref(&module), "/../x.so", &CleanOptions::default()).is_err());
        assert!(module.source_path().is_file());
        assert!(module.stale_artifact_path().is_file());
    }
}
