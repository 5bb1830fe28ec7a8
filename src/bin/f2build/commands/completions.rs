//! `f2build completions <shell>`

use anyhow::Result;
use clap::CommandFactory;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    clap_complete::generate(
        args.shell,
        &mut Cli::command(),
        "f2build",
        &mut std::io::stdout().lock(),
    );
    Ok(())
}
