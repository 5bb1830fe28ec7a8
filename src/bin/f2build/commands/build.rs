//! `f2build build` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::BuildArgs;
use f2build::ops::build;
use f2build::util::{GlobalContext, Shell};

pub fn execute(args: BuildArgs, ctx: &GlobalContext, shell: &Arc<Shell>) -> Result<()> {
    let outcome = build(ctx, &args.options(), shell)?;
    super::finish(&outcome, shell)
}
