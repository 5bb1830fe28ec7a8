//! Global context for f2build operations.
//!
//! Provides centralized access to the project root, config locations and
//! the module list.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::descriptor::default_modules;
use crate::core::manifest::{find_manifest, Manifest};
use crate::core::ModuleDescriptor;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};

/// Global context containing paths resolved once at startup.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Directory the tool was started from
    cwd: PathBuf,

    /// Project root: the manifest's directory, or `cwd` without a manifest
    project_root: PathBuf,

    /// Manifest in use, if any
    manifest_path: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a context rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd`, picking up `F2build.toml` if present.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let manifest_path = find_manifest(&cwd);
        GlobalContext {
            project_root: cwd.clone(),
            cwd,
            manifest_path,
        }
    }

    /// Use an explicit manifest. Its directory becomes the project root.
    pub fn with_manifest_path(mut self, path: PathBuf) -> Self {
        let path = if path.is_relative() {
            self.cwd.join(path)
        } else {
            path
        };
        self.project_root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());
        self.manifest_path = Some(path);
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Project-local config file (`.f2build/config.toml`).
    pub fn project_config_path(&self) -> PathBuf {
        project_config_path(&self.project_root)
    }

    /// Load merged global and project configuration.
    pub fn load_config(&self) -> Config {
        load_config(
            global_config_path().as_deref(),
            &self.project_config_path(),
        )
    }

    /// Resolve the module list from the manifest, or the defaults without one.
    pub fn modules(&self) -> Result<Vec<ModuleDescriptor>> {
        match &self.manifest_path {
            Some(path) => {
                let manifest = Manifest::load(path)?;
                tracing::debug!(
                    "Loaded {} module(s) from {}",
                    manifest.modules.len(),
                    path.display()
                );
                Ok(manifest.descriptors(&self.project_root))
            }
            None => Ok(default_modules(&self.project_root)),
        }
    }
}
