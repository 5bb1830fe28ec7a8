//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use f2build::ops::BuildOptions;
use f2build::util::shell::ColorChoice;

/// f2build - Build Fortran sources into Python extension modules
#[derive(Parser)]
#[command(name = "f2build")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors (the summary report is still printed)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for status messages and reports
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Path to F2build.toml (defaults to ./F2build.toml if present)
    #[arg(long, global = true)]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean, compile and verify every module (the default)
    Build(BuildArgs),

    /// Report which modules have a built artifact, without building
    Verify(VerifyArgs),

    /// Remove built artifacts and debug bundles
    Clean(CleanArgs),

    /// Check that the compiler, interpreter and sources are in place
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Toolchain overrides shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ToolchainArgs {
    /// Compiler front-end to run instead of f2py
    #[arg(long)]
    pub compiler: Option<PathBuf>,

    /// Python interpreter to query for the extension suffix
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Extension suffix to verify, e.g. `.cpython-311-x86_64-linux-gnu.so`
    #[arg(long)]
    pub ext_suffix: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Number of module directories to build at once
    #[arg(short, long, env = "F2BUILD_JOBS")]
    pub jobs: Option<usize>,

    /// Exit with an error if any module did not build
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Exit with an error if any module is missing its artifact
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    #[command(flatten)]
    pub toolchain: ToolchainArgs,

    /// Also remove artifacts built for other Python versions
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub toolchain: ToolchainArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

impl ToolchainArgs {
    /// Options with only the toolchain fields set.
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            compiler: self.compiler.clone(),
            python: self.python.clone(),
            ext_suffix: self.ext_suffix.clone(),
            ..Default::default()
        }
    }
}

impl BuildArgs {
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            jobs: self.jobs,
            strict: self.strict,
            ..self.toolchain.options()
        }
    }
}
