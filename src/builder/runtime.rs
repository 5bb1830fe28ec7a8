//! Python runtime query.
//!
//! The verified artifact name depends on the interpreter the extension is
//! built for (`EXT_SUFFIX`, e.g. `.cpython-311-x86_64-linux-gnu.so`). The
//! interpreter is asked once per run.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::descriptor::SOURCE_EXTENSION;
use crate::util::config::ToolchainSettings;
use crate::util::process::{find_python, ProcessBuilder};

/// Program run by the interpreter: major, minor on one line, `EXT_SUFFIX` on the next.
const QUERY_PROGRAM: &str = "import sys, sysconfig; \
print(sys.version_info[0], sys.version_info[1]); \
print(sysconfig.get_config_var('EXT_SUFFIX'))";

/// Suffix used when the interpreter cannot be asked.
#[cfg(windows)]
pub const PLATFORM_DEFAULT_SUFFIX: &str = ".pyd";
#[cfg(not(windows))]
pub const PLATFORM_DEFAULT_SUFFIX: &str = ".so";

/// Where the extension suffix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixSource {
    /// `--ext-suffix` or `toolchain.ext_suffix`
    Override,
    /// `sysconfig.get_config_var('EXT_SUFFIX')`
    Interpreter,
    PlatformDefault,
}

/// Interpreter major/minor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What the verification pass needs to know about the target runtime.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    /// Interpreter that answered the query, if any
    pub python: Option<PathBuf>,
    pub version: Option<PythonVersion>,
    pub ext_suffix: String,
    pub suffix_source: SuffixSource,
}

impl RuntimeInfo {
    /// Runtime with a fixed suffix and no interpreter. Used by tests and library callers.
    pub fn with_suffix(ext_suffix: impl Into<String>) -> Self {
        RuntimeInfo {
            python: None,
            version: None,
            ext_suffix: ext_suffix.into(),
            suffix_source: SuffixSource::Override,
        }
    }

    /// Major version for the report line, or `unknown`.
    pub fn major_version_label(&self) -> String {
        self.version
            .map(|v| v.major.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Parse the query program's stdout.
///
/// `EXT_SUFFIX` prints as `None` on interpreters that do not define it.
pub fn parse_query_output(stdout: &str) -> Result<(PythonVersion, Option<String>)> {
    let mut lines = stdout.lines().map(str::trim);

    let version_line = lines.next().unwrap_or_default();
    let mut parts = version_line.split_whitespace();
    let (Some(major), Some(minor)) = (parts.next(), parts.next()) else {
        bail!("unexpected interpreter output: {:?}", version_line);
    };
    let version = PythonVersion {
        major: major
            .parse()
            .with_context(|| format!("invalid major version {:?}", major))?,
        minor: minor
            .parse()
            .with_context(|| format!("invalid minor version {:?}", minor))?,
    };

    let suffix = lines
        .next()
        .filter(|s| !s.is_empty() && *s != "None")
        .map(str::to_string);

    Ok((version, suffix))
}

/// Run the query program with `python`.
pub fn query_interpreter(python: &Path) -> Result<(PythonVersion, Option<String>)> {
    let output = ProcessBuilder::new(python)
        .arg("-c")
        .arg(QUERY_PROGRAM)
        .exec_and_check()?;

    parse_query_output(&String::from_utf8_lossy(&output.stdout))
}

/// Check that `<name><suffix>` names a file next to the source.
///
/// Build and clean delete that file, so it must not be the Fortran source
/// and must not reach into another directory.
pub fn validate_ext_suffix(suffix: &str) -> Result<()> {
    if suffix.is_empty() {
        bail!("extension suffix is empty");
    }
    if suffix.eq_ignore_ascii_case(SOURCE_EXTENSION) {
        bail!(
            "extension suffix `{}` is the Fortran source extension",
            suffix
        );
    }
    if suffix.contains(['/', '\\']) {
        bail!("extension suffix `{}` contains a path separator", suffix);
    }
    Ok(())
}

/// Determine the runtime.
///
/// Interpreter: `--python` > `toolchain.python` > `PYTHON` env > `python3`/`python` on PATH.
/// Suffix: `--ext-suffix` > `toolchain.ext_suffix` > interpreter > platform default.
///
/// A configured suffix that fails [`validate_ext_suffix`] is an error; an
/// unusable interpreter answer falls back to the platform default.
pub fn resolve_runtime(
    cli_python: Option<&Path>,
    cli_suffix: Option<&str>,
    settings: &ToolchainSettings,
) -> Result<RuntimeInfo> {
    if let Some(suffix) = cli_suffix {
        validate_ext_suffix(suffix).context("invalid --ext-suffix")?;
    }
    if let Some(suffix) = &settings.ext_suffix {
        validate_ext_suffix(suffix).context("invalid toolchain.ext_suffix")?;
    }

    let python = cli_python
        .map(Path::to_path_buf)
        .or_else(|| settings.python.clone())
        .or_else(find_python);

    let (version, queried_suffix) = match &python {
        Some(python) => match query_interpreter(python) {
            Ok((version, suffix)) => {
                tracing::info!("Using Python {} at {}", version, python.display());
                let suffix = suffix.filter(|s| match validate_ext_suffix(s) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Ignoring EXT_SUFFIX from {}: {:#}", python.display(), e);
                        false
                    }
                });
                (Some(version), suffix)
            }
            Err(e) => {
                tracing::warn!("Failed to query {}: {:#}", python.display(), e);
                (None, None)
            }
        },
        None => {
            tracing::warn!("No Python interpreter found; set PYTHON or toolchain.python");
            (None, None)
        }
    };

    let override_suffix = cli_suffix
        .map(str::to_string)
        .or_else(|| settings.ext_suffix.clone());

    let (ext_suffix, suffix_source) = match (override_suffix, queried_suffix) {
        (Some(suffix), _) => (suffix, SuffixSource::Override),
        (None, Some(suffix)) => (suffix, SuffixSource::Interpreter),
        (None, None) => (
            PLATFORM_DEFAULT_SUFFIX.to_string(),
            SuffixSource::PlatformDefault,
        ),
    };

    tracing::debug!("Extension suffix {} ({:?})", ext_suffix, suffix_source);

    Ok(RuntimeInfo {
        python: version.and(python),
        version,
        ext_suffix,
        suffix_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_output() {
        let (version, suffix) =
            parse_query_output("3 11\n.cpython-311-x86_64-linux-gnu.so\n").unwrap();
        assert_eq!(version, PythonVersion { major: 3, minor: 11 });
        assert_eq!(suffix.as_deref(), Some(".cpython-311-x86_64-linux-gnu.so"));
    }

    #[test]
    fn test_parse_query_output_without_suffix() {
        let (version, suffix) = parse_query_output("3 4\nNone\n").unwrap();
        assert_eq!(version.to_string(), "3.4");
        assert!(suffix.is_none());
    }

    #[test]
    fn test_parse_query_output_windows_line_endings() {
        let (_, suffix) = parse_query_output("3 12\r\n.cp312-win_amd64.pyd\r\n").unwrap();
        assert_eq!(suffix.as_deref(), Some(".cp312-win_amd64.pyd"));
    }

    #[test]
    fn test_parse_query_output_garbage() {
        assert!(parse_query_output("").is_err());
        assert!(parse_query_output("Python 3\n").is_err());
    }

    #[test]
    fn test_cli_suffix_overrides_everything() {
        let settings = ToolchainSettings {
            python: Some(PathBuf::from("/nonexistent/python")),
            ext_suffix: Some(".config.so".to_string()),
            ..Default::default()
        };

        let runtime = resolve_runtime(None, Some(".cli.so"), &settings).unwrap();
        assert_eq!(runtime.ext_suffix, ".cli.so");
        assert_eq!(runtime.suffix_source, SuffixSource::Override);
        assert!(runtime.version.is_none());
        assert!(runtime.python.is_none());
        assert_eq!(runtime.major_version_label(), "unknown");
    }

    #[test]
    fn test_unusable_interpreter_falls_back_to_platform_default() {
        let settings = ToolchainSettings {
            python: Some(PathBuf::from("/nonexistent/python")),
            ..Default::default()
        };

        let runtime = resolve_runtime(None, None, &settings).unwrap();
        assert_eq!(runtime.ext_suffix, PLATFORM_DEFAULT_SUFFIX);
        assert_eq!(runtime.suffix_source, SuffixSource::PlatformDefault);
    }

    #[test]
    fn test_validate_ext_suffix() {
        assert!(validate_ext_suffix(".so").is_ok());
        assert!(validate_ext_suffix(".cpython-311-x86_64-linux-gnu.so").is_ok());
        assert!(validate_ext_suffix(".cp312-win_amd64.pyd").is_ok());

        assert!(validate_ext_suffix("").is_err());
        assert!(validate_ext_suffix(".f90").is_err());
        assert!(validate_ext_suffix(".F90").is_err());
        assert!(validate_ext_suffix("/../../lib.so").is_err());
        assert!(validate_ext_suffix(".so/x").is_err());
        assert!(validate_ext_suffix("\\..\\x.pyd").is_err());
    }

    #[test]
    fn test_unusable_override_is_an_error() {
        let settings = ToolchainSettings {
            python: Some(PathBuf::from("/nonexistent/python")),
            ..Default::default()
        };
        let err = resolve_runtime(None, Some(".f90"), &settings).unwrap_err();
        assert!(format!("{:#}", err).contains("--ext-suffix"));

        let settings = ToolchainSettings {
            ext_suffix: Some("../x.so".to_string()),
            ..settings
        };
        let err = resolve_runtime(None, None, &settings).unwrap_err();
        assert!(format!("{:#}", err).contains("toolchain.ext_suffix"));
    }

    #[test]
    fn test_with_suffix() {
        let runtime = RuntimeInfo::with_suffix(".so");
        assert_eq!(runtime.ext_suffix, ".so");
        assert_eq!(runtime.major_version_label(), "unknown");
    }
}
