//! f2build CLI - Build Fortran sources into Python extension modules

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{BuildArgs, Cli, Commands, MessageFormat};
use f2build::util::{GlobalContext, Shell};

fn main() {
    let cli = Cli::parse();
    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    ));

    if let Err(e) = run(cli, &shell) {
        shell.error(format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    // Logs go to stderr; stdout carries the report.
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("f2build=debug")
    } else if cli.quiet {
        EnvFilter::new("f2build=error")
    } else {
        EnvFilter::new("f2build=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(cli.color.enabled())
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    if let Some(path) = cli.manifest_path {
        ctx = ctx.with_manifest_path(path);
    }

    match cli.command.unwrap_or_else(|| Commands::Build(BuildArgs::default())) {
        Commands::Build(args) => commands::build::execute(args, &ctx, shell),
        Commands::Verify(args) => commands::verify::execute(args, &ctx, shell),
        Commands::Clean(args) => commands::clean::execute(args, &ctx, shell),
        Commands::Doctor(args) => commands::doctor::execute(args, &ctx, cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
