//! Build orchestration: resolve modules, toolchain and runtime, build every
//! module, then run the verification pass.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::builder::runtime::{resolve_runtime, RuntimeInfo};
use crate::builder::toolchain::detect_toolchain;
use crate::builder::{BuildReport, ExtensionBuilder};
use crate::ops::verify::{verify, VerifyReport};
use crate::util::{Config, GlobalContext, Shell, Status};

/// Options shared by `build`, `verify` and `clean`. Unset fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Compiler front-end to use instead of the configured/detected one
    pub compiler: Option<PathBuf>,
    /// Interpreter to query for the extension suffix
    pub python: Option<PathBuf>,
    /// Fixed extension suffix
    pub ext_suffix: Option<String>,
    /// Number of directories to build at once
    pub jobs: Option<usize>,
    /// Treat missing artifacts as a failure
    pub strict: bool,
}

/// Everything a build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build: Option<BuildReport>,
    pub verify: VerifyReport,
    strict: bool,
}

impl BuildOutcome {
    /// Whether the command should exit with a failure status.
    ///
    /// Only in strict mode; otherwise the report alone carries the result.
    pub fn should_fail(&self) -> bool {
        self.strict && !self.verify.all_present()
    }
}

/// Resolve the runtime from options layered over config.
///
/// Errors if the configured extension suffix is unusable.
pub fn runtime_for(options: &BuildOptions, config: &Config) -> Result<RuntimeInfo> {
    resolve_runtime(
        options.python.as_deref(),
        options.ext_suffix.as_deref(),
        &config.toolchain,
    )
}

/// Build every module and verify the artifacts.
///
/// Errors only if the module list cannot be determined (e.g. a broken
/// manifest) or the extension suffix is unusable. Compiler failures end up in the returned reports.
pub fn build(ctx: &GlobalContext, options: &BuildOptions, shell: &Arc<Shell>) -> Result<BuildOutcome> {
    let modules = ctx.modules()?;
    let config = ctx.load_config();

    let toolchain = detect_toolchain(
        options.compiler.as_deref(),
        &config.toolchain,
        ctx.cwd(),
        ctx.project_root(),
    );
    let runtime = runtime_for(options, &config)?;
    let jobs = options.jobs.or(config.build.jobs);

    tracing::debug!(
        "Building {} module(s) from {}",
        modules.len(),
        ctx.project_root().display()
    );

    let span = shell.span(Status::Compiling, "extension modules");
    let report = ExtensionBuilder::new(&toolchain, runtime.ext_suffix.clone(), Arc::clone(shell))
        .jobs(jobs)
        .display_root(ctx.project_root())
        .build(&modules);
    span.finish_with_message(format!(
        "{} module(s), {} failed",
        report.modules.len(),
        report.failed_count()
    ));

    let verify_report = verify(&modules, &runtime);

    Ok(BuildOutcome {
        build: Some(report),
        verify: verify_report,
        strict: options.strict || config.build.is_strict(),
    })
}

/// Run only the verification pass.
pub fn verify_project(ctx: &GlobalContext, options: &BuildOptions) -> Result<BuildOutcome> {
    let modules = ctx.modules()?;
    let config = ctx.load_config();
    let runtime = runtime_for(options, &config)?;

    Ok(BuildOutcome {
        build: None,
        verify: verify(&modules, &runtime),
        strict: options.strict || config.build.is_strict(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, GlobalContext) {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        for module in ctx.modules().unwrap() {
            fs::create_dir_all(&module.directory).unwrap();
            fs::write(module.source_path(), "").unwrap();
        }
        (tmp, ctx)
    }

    fn options(compiler: &str) -> BuildOptions {
        BuildOptions {
            compiler: Some(PathBuf::from(compiler)),
            python: Some(PathBuf::from("/nonexistent/python")),
            ext_suffix: Some(".so".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_build_is_not_an_error() {
        let (_tmp, ctx) = project();
        let shell = Arc::new(Shell::quiet());

        let outcome = build(&ctx, &options("/nonexistent/f2py"), &shell).unwrap();

        assert_eq!(outcome.verify.missing_count(), 3);
        assert_eq!(outcome.build.as_ref().unwrap().failed_count(), 3);
        assert!(!outcome.should_fail());
    }

    #[test]
    fn test_strict_mode_fails_on_missing_artifacts() {
        let (_tmp, ctx) = project();
        let shell = Arc::new(Shell::quiet());

        let mut opts = options("/nonexistent/f2py");
        assert!(!build(&ctx, &opts, &shell).unwrap().should_fail());

        opts.strict = true;
        assert!(build(&ctx, &opts, &shell).unwrap().should_fail());
    }

    #[test]
    fn test_verify_project_sees_existing_artifacts() {
        let (_tmp, ctx) = project();
        for module in ctx.modules().unwrap() {
            fs::write(module.artifact_path(".so"), "").unwrap();
        }

        let outcome = verify_project(&ctx, &options("f2py")).unwrap();
        assert!(outcome.build.is_none());
        assert!(outcome.verify.all_present());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_twice_is_idempotent() {
        use std::os::unix::fs::PermissionsExt;

        let (tmp, ctx) = project();
        let script = tmp.path().join("fake-f2py");
        fs::write(&script, "#!/bin/sh\ntouch \"$4.so\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let shell = Arc::new(Shell::quiet());
        let opts = options(script.to_str().unwrap());

        let first = build(&ctx, &opts, &shell).unwrap();
        let second = build(&ctx, &opts, &shell).unwrap();

        let present = |o: &BuildOutcome| o.verify.checks.iter().map(|c| c.present).collect::<Vec<_>>();
        assert_eq!(present(&first), vec![true, true, true]);
        assert_eq!(present(&first), present(&second));
    }

    #[test]
    fn test_source_extension_as_suffix_keeps_sources() {
        let (_tmp, ctx) = project();
        let shell = Arc::new(Shell::quiet());
        let mut opts = options("/nonexistent/f2py");
        opts.ext_suffix = Some(".f90".to_string());

        assert!(build(&ctx, &opts, &shell).is_err());
        assert!(verify_project(&ctx, &opts).is_err());
        for module in ctx.modules().unwrap() {
            assert!(module.source_path().is_file());
        }
    }
}
