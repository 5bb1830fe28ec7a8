//! The extension builder.
//!
//! For every module, in order:
//! 1. remove the stale `<name>.so` (and `<name><ext_suffix>`) artifact
//! 2. run the compiler front-end inside the module directory
//! 3. remove the `<name>.so.dSYM` debug bundle
//!
//! Every step is best-effort: failures are recorded in the returned
//! [`BuildReport`] and the remaining steps and modules still run. Paths are
//! always joined onto the module directory; the process working directory
//! is never changed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::builder::events::BuildEvent;
use crate::builder::steps::{StepError, StepKind, StepOutcome, StepStatus};
use crate::builder::toolchain::Toolchain;
use crate::core::ModuleDescriptor;
use crate::util::fs::{relative_path, remove_dir_all_if_exists, remove_file_if_exists};
use crate::util::process::tail_lines;
use crate::util::shell::{Progress, Shell, Status};

/// Lines of compiler stderr kept in a failed step.
const STDERR_TAIL_LINES: usize = 20;

/// Outcome of all steps for one module.
#[derive(Debug, Clone)]
pub struct ModuleBuild {
    pub module: ModuleDescriptor,
    pub steps: Vec<StepOutcome>,
}

impl ModuleBuild {
    /// True if no step failed.
    pub fn succeeded(&self) -> bool {
        !self.steps.iter().any(|s| s.status.is_failed())
    }

    pub fn step(&self, kind: StepKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.kind == kind)
    }
}

/// Outcome of a whole build, in module order.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub modules: Vec<ModuleBuild>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn failed_count(&self) -> usize {
        self.modules.iter().filter(|m| !m.succeeded()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Runs the per-module steps.
pub struct ExtensionBuilder<'a> {
    toolchain: &'a Toolchain,
    ext_suffix: String,
    shell: Arc<Shell>,
    jobs: Option<usize>,
    display_root: Option<PathBuf>,
}

impl<'a> ExtensionBuilder<'a> {
    /// Create a builder. `ext_suffix` names the runtime-specific artifact
    /// that is cleaned alongside `<name>.so`.
    pub fn new(toolchain: &'a Toolchain, ext_suffix: impl Into<String>, shell: Arc<Shell>) -> Self {
        ExtensionBuilder {
            toolchain,
            ext_suffix: ext_suffix.into(),
            shell,
            jobs: None,
            display_root: None,
        }
    }

    /// Build up to `jobs` module directories at once. `None` or 1 is sequential.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Show module directories relative to this path in status output.
    pub fn display_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.display_root = Some(root.into());
        self
    }

    /// Build all modules. Never fails; see [`BuildReport`].
    pub fn build(&self, modules: &[ModuleDescriptor]) -> BuildReport {
        let start = Instant::now();
        let progress = self.shell.progress(modules.len() as u64, "Building");

        let jobs = self.jobs.unwrap_or(1).max(1);
        let built = if jobs > 1 && modules.len() > 1 {
            self.build_parallel(modules, jobs, &progress)
        } else {
            modules
                .iter()
                .map(|m| self.build_one(m, &progress))
                .collect()
        };

        let done = progress.finish();
        tracing::debug!("{} of {} module(s) processed", done, modules.len());

        let report = BuildReport {
            modules: built,
            duration: start.elapsed(),
        };

        self.shell.json_event(
            &BuildEvent::finished(
                report.modules.len() as u64,
                report.failed_count() as u64,
                report.duration.as_millis() as u64,
            )
            .to_value(),
        );

        report
    }

    /// Modules sharing a directory run in order on one worker; directories
    /// run concurrently. The compiler writes scratch files into its working
    /// directory, so two invocations must not share one.
    fn build_parallel(
        &self,
        modules: &[ModuleDescriptor],
        jobs: usize,
        progress: &Progress,
    ) -> Vec<ModuleBuild> {
        let groups = group_by_directory(modules);

        let pool = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Failed to start {} workers, building sequentially: {}", jobs, e);
                return modules
                    .iter()
                    .map(|m| self.build_one(m, progress))
                    .collect();
            }
        };

        tracing::debug!(
            "Building {} directories with {} worker(s)",
            groups.len(),
            jobs
        );

        let mut indexed: Vec<(usize, ModuleBuild)> = pool.install(|| {
            groups
                .par_iter()
                .flat_map_iter(|group| {
                    group
                        .iter()
                        .map(|&index| (index, self.build_one(&modules[index], progress)))
                        .collect::<Vec<_>>()
                })
                .collect()
        });

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, build)| build).collect()
    }

    fn build_one(&self, module: &ModuleDescriptor, progress: &Progress) -> ModuleBuild {
        let build = self.build_module(module, progress);
        progress.inc(1);
        build
    }

    /// Run all steps for one module.
    pub fn build_module(&self, module: &ModuleDescriptor, progress: &Progress) -> ModuleBuild {
        let mut steps = Vec::with_capacity(3);

        if !module.directory.is_dir() {
            let err = StepError::MissingDirectory(module.directory.clone());
            tracing::debug!("{}: {}", module.base_name, err);
            progress.println(Status::Warning, format!("{}: {}", module.base_name, err));
            for kind in [StepKind::CleanStale, StepKind::Compile, StepKind::CleanDebugBundle] {
                let outcome =
                    StepOutcome::new(kind, StepStatus::Failed(err.clone()), Duration::ZERO);
                self.emit_step(module, &outcome);
                steps.push(outcome);
            }
            self.emit_module_finished(module, false);
            return ModuleBuild {
                module: module.clone(),
                steps,
            };
        }

        for kind in [StepKind::CleanStale, StepKind::Compile, StepKind::CleanDebugBundle] {
            let start = Instant::now();
            let status = match kind {
                StepKind::CleanStale => self.clean_stale(module),
                StepKind::Compile => {
                    progress.println(
                        Status::Compiling,
                        format!("{} ({})", module.base_name, self.display_dir(&module.directory)),
                    );
                    self.compile(module)
                }
                StepKind::CleanDebugBundle => self.clean_debug_bundle(module),
            };
            let outcome = StepOutcome::new(kind, status, start.elapsed());
            self.report_step(module, &outcome, progress);
            steps.push(outcome);
        }

        let build = ModuleBuild {
            module: module.clone(),
            steps,
        };
        self.emit_module_finished(module, build.succeeded());
        build
    }

    /// Remove `<name>.so` and, when it differs, `<name><ext_suffix>`.
    fn clean_stale(&self, module: &ModuleDescriptor) -> StepStatus {
        let mut candidates = vec![module.stale_artifact_path()];
        let current = module.artifact_path(&self.ext_suffix);
        if !candidates.contains(&current) {
            candidates.push(current);
        }

        let mut removed = Vec::new();
        for path in candidates {
            match remove_file_if_exists(&path) {
                Ok(true) => removed.push(path),
                Ok(false) => {}
                Err(e) => return StepStatus::Failed(StepError::Io(format!("{:#}", e))),
            }
        }

        if removed.is_empty() {
            StepStatus::Skipped
        } else {
            StepStatus::Done(removed)
        }
    }

    fn compile(&self, module: &ModuleDescriptor) -> StepStatus {
        let source = module.source_path();
        if !source.is_file() {
            return StepStatus::Failed(StepError::MissingSource(source));
        }

        let cmd = self.toolchain.compile_command(module);
        let command = cmd.display_command();
        tracing::debug!("Running `{}` in {}", command, module.directory.display());

        let output = match cmd.exec() {
            Ok(output) => output,
            Err(e) => {
                return StepStatus::Failed(StepError::Spawn {
                    command,
                    message: e.root_cause().to_string(),
                })
            }
        };

        if !output.status.success() {
            return StepStatus::Failed(StepError::ExitStatus {
                command,
                code: output.status.code(),
                stderr: tail_lines(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        let artifact = module.artifact_path(&self.ext_suffix);
        if artifact.is_file() {
            StepStatus::Done(vec![artifact])
        } else {
            tracing::debug!(
                "`{}` succeeded but {} is missing",
                command,
                artifact.display()
            );
            StepStatus::Done(Vec::new())
        }
    }

    fn clean_debug_bundle(&self, module: &ModuleDescriptor) -> StepStatus {
        let bundle = module.debug_bundle_path();
        match remove_dir_all_if_exists(&bundle) {
            Ok(true) => StepStatus::Done(vec![bundle]),
            Ok(false) => StepStatus::Skipped,
            Err(e) => StepStatus::Failed(StepError::Io(format!("{:#}", e))),
        }
    }

    fn report_step(&self, module: &ModuleDescriptor, outcome: &StepOutcome, progress: &Progress) {
        self.emit_step(module, outcome);

        match &outcome.status {
            StepStatus::Done(paths) if outcome.kind != StepKind::Compile => {
                for path in paths {
                    progress.println(Status::Removed, self.display_dir(path));
                }
            }
            StepStatus::Done(_) => {
                tracing::debug!("{}: compiled in {:.2?}", module.base_name, outcome.duration);
            }
            StepStatus::Skipped => {
                if self.shell.is_verbose() {
                    progress.println(
                        Status::Skipped,
                        format!("{}: nothing to {}", module.base_name, outcome.kind),
                    );
                }
            }
            StepStatus::Failed(err) => {
                tracing::debug!("{}: {} failed: {}", module.base_name, outcome.kind, err);
                progress.println(Status::Warning, format!("{}: {}", module.base_name, err));
                if let Some(stderr) = err.stderr() {
                    if self.shell.is_verbose() {
                        eprintln!("{}", stderr);
                    }
                }
            }
        }
    }

    fn emit_step(&self, module: &ModuleDescriptor, outcome: &StepOutcome) {
        if self.shell.is_json() {
            self.shell
                .json_event(&BuildEvent::step(&module.base_name, outcome).to_value());
        }
    }

    fn emit_module_finished(&self, module: &ModuleDescriptor, success: bool) {
        if self.shell.is_json() {
            let event = BuildEvent::ModuleFinished {
                module: module.base_name.clone(),
                directory: module.directory.clone(),
                success,
            };
            self.shell.json_event(&event.to_value());
        }
    }

    fn display_dir(&self, path: &Path) -> String {
        match &self.display_root {
            Some(root) => relative_path(root, path).display().to_string(),
            None => path.display().to_string(),
        }
    }
}

/// Group module indices by directory, keeping first-appearance order.
pub fn group_by_directory(modules: &[ModuleDescriptor]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
    for (index, module) in modules.iter().enumerate() {
        match groups.iter_mut().find(|(dir, _)| *dir == module.directory) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((module.directory.clone(), vec![index])),
        }
    }
    groups.into_iter().map(|(_, indices)| indices).collect()
}
