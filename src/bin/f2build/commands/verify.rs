//! `f2build verify` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::VerifyArgs;
use f2build::ops::verify_project;
use f2build::util::{GlobalContext, Shell, Status};

pub fn execute(args: VerifyArgs, ctx: &GlobalContext, shell: &Arc<Shell>) -> Result<()> {
    let mut options = args.toolchain.options();
    options.strict = args.strict;

    shell.verbose(Status::Checking, ctx.project_root().display());
    let outcome = verify_project(ctx, &options)?;
    super::finish(&outcome, shell)
}
