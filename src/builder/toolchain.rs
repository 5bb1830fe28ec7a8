//! Compiler front-end selection and command construction.
//!
//! The front-end is `f2py` unless configured otherwise. It is invoked as
//! `<compiler> -c <name>.f90 -m <name> [extra args]` with the module
//! directory as its working directory.

use std::path::{Path, PathBuf};

use crate::core::ModuleDescriptor;
use crate::util::config::ToolchainSettings;
use crate::util::process::{find_executable, find_f2py, ProcessBuilder};

/// Name used when nothing was configured or found on PATH.
pub const DEFAULT_COMPILER: &str = "f2py";

/// Where the compiler path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerSource {
    CommandLine,
    Config,
    /// `F2PY` environment variable or a search of PATH
    Detected,
    /// Not found anywhere; spawning will most likely fail per module.
    Fallback,
}

/// The compiler front-end used for every module.
#[derive(Debug, Clone)]
pub struct Toolchain {
    compiler: PathBuf,
    extra_args: Vec<String>,
    source: CompilerSource,
}

impl Toolchain {
    /// A toolchain with an explicit compiler and no extra arguments.
    pub fn new(compiler: impl Into<PathBuf>) -> Self {
        Toolchain {
            compiler: compiler.into(),
            extra_args: Vec::new(),
            source: CompilerSource::CommandLine,
        }
    }

    /// Append extra arguments to every compile command.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn source(&self) -> CompilerSource {
        self.source
    }

    /// Build the compile command for one module.
    ///
    /// The source is passed by file name; the command runs inside the
    /// module directory so the artifact lands next to the source.
    pub fn compile_command(&self, module: &ModuleDescriptor) -> ProcessBuilder {
        ProcessBuilder::new(&self.compiler)
            .arg("-c")
            .arg(module.source_file_name())
            .arg("-m")
            .arg(&module.base_name)
            .args(&self.extra_args)
            .cwd(&module.directory)
    }

    /// Ask the front-end for its version (`-v`), if it runs at all.
    pub fn version(&self) -> Option<String> {
        let output = ProcessBuilder::new(&self.compiler).arg("-v").exec().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|l| l.trim().to_string())
    }
}

/// Detect the compiler front-end.
///
/// Priority:
/// 1. `--compiler` on the command line
/// 2. `toolchain.compiler` in config
/// 3. `F2PY` environment variable, then `f2py` / `f2py3` on PATH
/// 4. bare `f2py`
///
/// The compiler runs inside each module directory, so a relative path with a
/// directory part is anchored here: command-line paths to `cwd`, config paths
/// to `project_root`.
pub fn detect_toolchain(
    cli_compiler: Option<&Path>,
    settings: &ToolchainSettings,
    cwd: &Path,
    project_root: &Path,
) -> Toolchain {
    let (compiler, source) = if let Some(path) = cli_compiler {
        (resolve_program(path, cwd), CompilerSource::CommandLine)
    } else if let Some(path) = settings.compiler.as_deref() {
        (resolve_program(path, project_root), CompilerSource::Config)
    } else if let Some(path) = find_f2py() {
        (path, CompilerSource::Detected)
    } else {
        tracing::warn!(
            "No `{}` found on PATH; set F2PY or toolchain.compiler",
            DEFAULT_COMPILER
        );
        (PathBuf::from(DEFAULT_COMPILER), CompilerSource::Fallback)
    };

    tracing::info!("Using compiler {} ({:?})", compiler.display(), source);

    Toolchain {
        compiler,
        extra_args: settings.args.clone(),
        source,
    }
}

/// Resolve a bare program name through PATH and a relative path against `base`.
fn resolve_program(program: &Path, base: &Path) -> PathBuf {
    if program.components().count() == 1 && program.is_relative() {
        if let Some(found) = find_executable(&program.to_string_lossy()) {
            return found;
        }
        return program.to_path_buf();
    }
    if program.is_relative() {
        base.join(program)
    } else {
        program.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_command() {
        let toolchain = Toolchain::new("/usr/bin/f2py");
        let module = ModuleDescriptor::new("/proj/mistree/mst", "utility_mst");

        let cmd = toolchain.compile_command(&module);
        assert_eq!(cmd.get_program(), Path::new("/usr/bin/f2py"));
        assert_eq!(
            cmd.get_args(),
            &["-c", "utility_mst.f90", "-m", "utility_mst"]
        );
        assert_eq!(cmd.get_cwd(), Some(Path::new("/proj/mistree/mst")));
    }

    #[test]
    fn test_extra_args_follow_module_args() {
        let toolchain = Toolchain::new("f2py").with_extra_args(vec!["--quiet".to_string()]);
        let module = ModuleDescriptor::new("levy_flight", "utility_random_walk");

        let cmd = toolchain.compile_command(&module);
        assert_eq!(
            cmd.display_command(),
            "f2py -c utility_random_walk.f90 -m utility_random_walk --quiet"
        );
    }

    #[test]
    fn test_cli_compiler_wins_over_config() {
        let settings = ToolchainSettings {
            compiler: Some(PathBuf::from("/config/f2py")),
            args: vec!["--opt=-O2".to_string()],
            ..Default::default()
        };

        let toolchain = detect_toolchain(
            Some(Path::new("/cli/f2py")),
            &settings,
            Path::new("/work"),
            Path::new("/proj"),
        );
        assert_eq!(toolchain.compiler(), Path::new("/cli/f2py"));
        assert_eq!(toolchain.source(), CompilerSource::CommandLine);
        assert_eq!(toolchain.extra_args(), &["--opt=-O2"]);
    }

    #[test]
    fn test_config_compiler_used() {
        let settings = ToolchainSettings {
            compiler: Some(PathBuf::from("/config/f2py")),
            ..Default::default()
        };

        let toolchain = detect_toolchain(None, &settings, Path::new("/work"), Path::new("/proj"));
        assert_eq!(toolchain.compiler(), Path::new("/config/f2py"));
        assert_eq!(toolchain.source(), CompilerSource::Config);
    }

    #[test]
    fn test_relative_cli_compiler_anchored_to_cwd() {
        let toolchain = detect_toolchain(
            Some(Path::new("tools/f2py")),
            &ToolchainSettings::default(),
            Path::new("/work"),
            Path::new("/proj"),
        );
        assert_eq!(toolchain.compiler(), Path::new("/work/tools/f2py"));
    }

    #[test]
    fn test_relative_config_compiler_anchored_to_project_root() {
        let settings = ToolchainSettings {
            compiler: Some(PathBuf::from("venv/bin/f2py")),
            ..Default::default()
        };

        let toolchain = detect_toolchain(None, &settings, Path::new("/work"), Path::new("/proj"));
        assert_eq!(toolchain.compiler(), Path::new("/proj/venv/bin/f2py"));
    }

    #[test]
    fn test_bare_name_not_anchored() {
        let toolchain = detect_toolchain(
            Some(Path::new("f2build-no-such-compiler")),
            &ToolchainSettings::default(),
            Path::new("/work"),
            Path::new("/proj"),
        );
        assert_eq!(toolchain.compiler(), Path::new("f2build-no-such-compiler"));
    }

    #[test]
    fn test_missing_compiler_has_no_version() {
        let toolchain = Toolchain::new("/nonexistent/f2py");
        assert!(toolchain.version().is_none());
    }
}
