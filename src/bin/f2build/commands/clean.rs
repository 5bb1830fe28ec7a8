//! `f2build clean` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::CleanArgs;
use f2build::ops::f2build_build::runtime_for;
use f2build::ops::{clean, CleanOptions};
use f2build::util::fs::relative_path;
use f2build::util::{GlobalContext, Shell, Status};

pub fn execute(args: CleanArgs, ctx: &GlobalContext, shell: &Arc<Shell>) -> Result<()> {
    let modules = ctx.modules()?;
    let config = ctx.load_config();
    let runtime = runtime_for(&args.toolchain.options(), &config)?;

    let report = clean(&modules, &runtime.ext_suffix, &CleanOptions { all: args.all })?;

    for module in &report.skipped {
        shell.status(
            Status::Skipped,
            format!(
                "{}: no directory {}",
                module.base_name,
                relative_path(ctx.project_root(), &module.directory).display()
            ),
        );
    }
    for path in &report.removed {
        shell.status(
            Status::Removed,
            relative_path(ctx.project_root(), path).display(),
        );
    }
    if report.removed.is_empty() {
        shell.note("nothing to clean");
    }

    Ok(())
}
