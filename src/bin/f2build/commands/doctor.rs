//! `f2build doctor` command

use anyhow::{bail, Result};

use crate::cli::DoctorArgs;
use f2build::ops::{doctor, format_report};
use f2build::util::GlobalContext;

pub fn execute(args: DoctorArgs, ctx: &GlobalContext, verbose: bool) -> Result<()> {
    let report = doctor(ctx, &args.toolchain.options())?;

    print!("{}", format_report(&report, verbose));

    if !report.is_healthy() {
        bail!("{} required check(s) failed", report.required_problems());
    }

    Ok(())
}
