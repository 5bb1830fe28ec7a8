//! Configuration files.
//!
//! Two optional TOML files, the later one winning field by field:
//! - `~/.f2build/config.toml` for the user
//! - `.f2build/config.toml` in the project root
//!
//! Command-line flags are applied on top by the operations that take them.
//!
//! ```toml
//! [toolchain]
//! compiler = "/opt/venv/bin/f2py"
//! args = ["--opt=-O3"]
//! python = "/opt/venv/bin/python"
//!
//! [build]
//! jobs = 2
//! strict = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub toolchain: ToolchainSettings,
    pub build: BuildConfig,
}

/// `[toolchain]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Compiler front-end used instead of the detected `f2py`
    pub compiler: Option<PathBuf>,
    /// Appended to every compile command after `-m <name>`
    pub args: Vec<String>,
    /// Interpreter asked for the version and extension suffix
    pub python: Option<PathBuf>,
    /// Extension suffix to verify, skipping the interpreter's answer
    pub ext_suffix: Option<String>,
}

/// `[build]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Module directories built at once; unset means one at a time
    pub jobs: Option<usize>,
    /// Exit non-zero when a module did not build
    pub strict: Option<bool>,
}

impl BuildConfig {
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Read `path` if it exists. A broken file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.is_file() {
            return Config::default();
        }
        Config::load(path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring {:#}", e);
            Config::default()
        })
    }

    /// `self` with every field that `over` sets replaced.
    pub fn layered(self, over: Config) -> Config {
        let args = if over.toolchain.args.is_empty() {
            self.toolchain.args
        } else {
            over.toolchain.args
        };

        Config {
            toolchain: ToolchainSettings {
                compiler: over.toolchain.compiler.or(self.toolchain.compiler),
                args,
                python: over.toolchain.python.or(self.toolchain.python),
                ext_suffix: over.toolchain.ext_suffix.or(self.toolchain.ext_suffix),
            },
            build: BuildConfig {
                jobs: over.build.jobs.or(self.build.jobs),
                strict: over.build.strict.or(self.build.strict),
            },
        }
    }
}

/// Global config layered under the project config.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    global_path
        .map(Config::load_or_default)
        .unwrap_or_default()
        .layered(Config::load_or_default(project_path))
}

/// `~/.f2build`
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".f2build"))
}

/// `~/.f2build/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// `<project_root>/.f2build/config.toml`
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".f2build").join("config.toml")
}
