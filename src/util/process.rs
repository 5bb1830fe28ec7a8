//! Running external tools.
//!
//! Every child gets an explicit working directory from the caller; the
//! working directory of this process is never touched.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// A command line plus the directory to run it in.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Run the child in `dir`.
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Run to completion with stdin closed and both output streams captured.
    ///
    /// Errors only if the child could not be started or waited on; a non-zero
    /// exit is left to the caller.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        cmd.output()
            .with_context(|| format!("failed to run `{}`", self.display_command()))
    }

    /// Like [`exec`](Self::exec), but a non-zero exit is an error carrying stderr.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            bail!(
                "`{}` failed with exit code {}\n{}",
                self.display_command(),
                output
                    .status
                    .code()
                    .map_or_else(|| "none".to_string(), |c| c.to_string()),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        Ok(output)
    }

    /// `program arg1 arg2 ...`, for messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Look `name` up on PATH. Paths with a directory part are checked as given.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// First of `candidates` found on PATH.
pub fn find_first(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().find_map(|name| find_executable(name))
}

/// `$var` if it names a runnable program, otherwise the first of `names`.
fn find_with_env_override(var: &str, names: &[&str]) -> Option<PathBuf> {
    std::env::var_os(var)
        .and_then(|program| which::which(program).ok())
        .or_else(|| find_first(names))
}

/// The f2py front-end: `$F2PY`, then `f2py` or `f2py3`.
pub fn find_f2py() -> Option<PathBuf> {
    find_with_env_override("F2PY", &["f2py", "f2py3"])
}

/// A Python interpreter: `$PYTHON`, then `python3` or `python`.
pub fn find_python() -> Option<PathBuf> {
    find_with_env_override("PYTHON", &["python3", "python"])
}

/// Last `max_lines` lines of captured output, lossily decoded.
pub fn tail_lines(bytes: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_cwd_is_scoped_to_child() {
        let tmp = tempfile::TempDir::new().unwrap();
        let before = std::env::current_dir().unwrap();

        let output = ProcessBuilder::new("pwd").cwd(tmp.path()).exec().unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = PathBuf::from(stdout.trim()).canonicalize().unwrap();

        assert_eq!(reported, tmp.path().canonicalize().unwrap());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_and_check_reports_exit_code() {
        let err = ProcessBuilder::new("false").exec_and_check().unwrap_err();
        assert!(err.to_string().contains("failed with exit code"));
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let result = ProcessBuilder::new("definitely-not-a-real-program-f2build").exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("f2py").args(["-c", "utility_mst.f90", "-m", "utility_mst"]);

        assert_eq!(pb.display_command(), "f2py -c utility_mst.f90 -m utility_mst");
    }

    #[test]
    fn test_tail_lines() {
        let out = b"one\ntwo\nthree\nfour\n";
        assert_eq!(tail_lines(out, 2), "three\nfour");
        assert_eq!(tail_lines(out, 10), "one\ntwo\nthree\nfour");
        assert_eq!(tail_lines(b"", 3), "");
    }
}
