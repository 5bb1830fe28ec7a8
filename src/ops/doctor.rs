//! `f2build doctor`: is everything the build shells out to in place?
//!
//! Checks the f2py front-end, the Python interpreter that supplies the
//! extension suffix, a Fortran compiler for f2py to drive (optional, since
//! f2py may be configured with one we cannot see), and every module source.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::builder::runtime::{resolve_runtime, SuffixSource};
use crate::builder::toolchain::{detect_toolchain, CompilerSource};
use crate::core::ModuleDescriptor;
use crate::ops::f2build_build::BuildOptions;
use crate::util::config::ToolchainSettings;
use crate::util::process::find_first;
use crate::util::GlobalContext;

/// Fortran compilers f2py knows how to drive.
const FORTRAN_COMPILERS: &[&str] = &["gfortran", "flang-new", "flang", "ifx", "ifort"];

/// One line of the doctor report.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// A failed optional check does not fail `doctor`.
    pub required: bool,
    pub detail: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl CheckResult {
    pub fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            required: true,
            detail: detail.into(),
            path: None,
            version: None,
        }
    }

    pub fn problem(name: impl Into<String>, detail: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::ok(name, detail)
        }
    }

    pub fn optional(self) -> Self {
        CheckResult {
            required: false,
            ..self
        }
    }

    pub fn at(self, path: impl Into<PathBuf>) -> Self {
        CheckResult {
            path: Some(path.into()),
            ..self
        }
    }

    pub fn version(self, version: impl Into<String>) -> Self {
        CheckResult {
            version: Some(version.into()),
            ..self
        }
    }
}

/// All checks, in the order they ran.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// No required check failed.
    pub fn is_healthy(&self) -> bool {
        self.required_problems() == 0
    }

    pub fn problems(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_problems(&self) -> usize {
        self.checks.iter().filter(|c| c.required && !c.passed).count()
    }
}

/// Run every check.
///
/// Errors only if the module list cannot be determined.
pub fn doctor(ctx: &GlobalContext, options: &BuildOptions) -> Result<DoctorReport> {
    let config = ctx.load_config();
    let modules = ctx.modules()?;

    let mut checks = vec![
        check_f2py(ctx, options, &config.toolchain),
        check_python(options, &config.toolchain),
        check_fortran(),
    ];
    checks.extend(modules.iter().map(check_module));

    Ok(DoctorReport { checks })
}

fn check_f2py(
    ctx: &GlobalContext,
    options: &BuildOptions,
    settings: &ToolchainSettings,
) -> CheckResult {
    let toolchain = detect_toolchain(
        options.compiler.as_deref(),
        settings,
        ctx.cwd(),
        ctx.project_root(),
    );
    let compiler = toolchain.compiler().to_path_buf();

    match (toolchain.version(), toolchain.source()) {
        (Some(version), _) => CheckResult::ok("f2py", "front-end runs")
            .at(compiler)
            .version(version),
        (None, CompilerSource::Fallback) => CheckResult::problem(
            "f2py",
            "not on PATH; install numpy or set F2PY or toolchain.compiler",
        ),
        (None, _) => {
            CheckResult::problem("f2py", format!("`{} -v` did not run", compiler.display()))
                .at(compiler)
        }
    }
}

fn check_python(options: &BuildOptions, settings: &ToolchainSettings) -> CheckResult {
    let runtime = match resolve_runtime(
        options.python.as_deref(),
        options.ext_suffix.as_deref(),
        settings,
    ) {
        Ok(runtime) => runtime,
        Err(e) => return CheckResult::problem("python", format!("{:#}", e)),
    };

    match (&runtime.python, runtime.version) {
        (Some(python), Some(version)) => {
            let origin = match runtime.suffix_source {
                SuffixSource::Override => " (configured)",
                _ => "",
            };
            CheckResult::ok("python", format!("suffix {}{}", runtime.ext_suffix, origin))
                .at(python.clone())
                .version(version.to_string())
        }
        // A fixed suffix makes the interpreter a nice-to-have.
        _ if runtime.suffix_source == SuffixSource::Override => CheckResult::problem(
            "python",
            format!("no working interpreter; using suffix {}", runtime.ext_suffix),
        )
        .optional(),
        _ => CheckResult::problem(
            "python",
            format!(
                "no working interpreter; set PYTHON or toolchain.python (falling back to {})",
                runtime.ext_suffix
            ),
        ),
    }
}

fn check_fortran() -> CheckResult {
    let check = match find_first(FORTRAN_COMPILERS) {
        Some(path) => CheckResult::ok("fortran", "compiler found").at(path),
        None => CheckResult::problem(
            "fortran",
            format!("none of {} on PATH", FORTRAN_COMPILERS.join(", ")),
        ),
    };
    check.optional()
}

fn check_module(module: &ModuleDescriptor) -> CheckResult {
    let name = format!("module {}", module.base_name);
    let source = module.source_path();

    if !module.directory.is_dir() {
        CheckResult::problem(
            name,
            format!("directory {} is missing", module.directory.display()),
        )
    } else if !source.is_file() {
        CheckResult::problem(name, format!("{} is missing", source.display()))
    } else {
        CheckResult::ok(name, "source present").at(source)
    }
}

/// Render the report. Details of passing checks only appear with `verbose`.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    let mut out = String::new();
    let width = report
        .checks
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);

    // Writing to a String cannot fail.
    let _ = writeln!(out, "f2build doctor\n");
    for check in &report.checks {
        let mark = if check.passed { "[OK]" } else { "[!!]" };
        let _ = write!(out, "  {} {:<width$}", mark, check.name, width = width);

        if !check.passed || verbose {
            let _ = write!(out, "  {}", check.detail);
        }
        if !check.required {
            let _ = write!(out, " (optional)");
        }
        let _ = writeln!(out);

        if verbose {
            if let Some(version) = &check.version {
                let _ = writeln!(out, "       version: {}", version);
            }
            if let Some(path) = &check.path {
                let _ = writeln!(out, "       path: {}", path.display());
            }
        }
    }

    let _ = writeln!(out);
    match (report.required_problems(), report.problems()) {
        (0, 0) => {
            let _ = writeln!(out, "Everything needed to build is in place.");
        }
        (0, optional) => {
            let _ = writeln!(
                out,
                "Ready to build; {} optional check(s) did not pass.",
                optional
            );
        }
        (required, _) => {
            let _ = writeln!(
                out,
                "{} required check(s) failed; affected modules will report `No`.",
                required
            );
        }
    }

    out
}
