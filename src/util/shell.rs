//! Console output.
//!
//! Status lines and the progress bar go to stderr. Stdout is reserved for
//! the summary report or, with `--message-format json`, one event per line.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Width status labels are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// How much human output to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only; the report is still printed.
    Quiet,
    #[default]
    Normal,
    /// Every step, compiler stderr, no progress bar.
    Verbose,
}

/// `--color` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Whether stderr gets ANSI colour.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            other => Err(format!(
                "unknown color setting `{}` (expected auto, always or never)",
                other
            )),
        }
    }
}

/// Label printed in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Removed,
    Finished,
    Compiling,
    Checking,
    Info,
    Skipped,
    Warning,
    Error,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Removed => "Removed",
            Status::Finished => "Finished",
            Status::Compiling => "Compiling",
            Status::Checking => "Checking",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    /// Bold ANSI colour for the label.
    fn ansi(self) -> &'static str {
        match self {
            Status::Removed | Status::Finished => "\x1b[1;32m",
            Status::Compiling | Status::Checking => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Shared output handle. Cheap to wrap in an `Arc` and hand to workers.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    json: bool,
    color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice, json: bool) -> Self {
        Shell {
            verbosity,
            json,
            color: !json && color.enabled(),
        }
    }

    /// Build from the global CLI flags. `--quiet` wins over `--verbose`.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Shell::new(verbosity, color, json)
    }

    /// Errors only, no colour. Used by library callers and tests.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never, false)
    }

    /// JSON mode has no verbosity of its own; human output is off entirely.
    pub fn is_quiet(&self) -> bool {
        !self.json && self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        !self.json && self.verbosity == Verbosity::Verbose
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// `{label:>12} {msg}` on stderr. Silent with `--quiet`; see [`Shell::error`].
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.json || self.verbosity == Verbosity::Quiet {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{} {}", self.render(status), msg);
    }

    /// Status line shown only with `--verbose`.
    pub fn verbose(&self, status: Status, msg: impl Display) {
        if self.is_verbose() {
            self.status(status, msg);
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// `error: {msg}` on stderr, printed in every mode.
    pub fn error(&self, msg: impl Display) {
        let label = if self.color {
            format!("{}{}\x1b[0m", Status::Error.ansi(), Status::Error.label())
        } else {
            Status::Error.label().to_string()
        };
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}: {}", label, msg);
    }

    /// Write one JSON event line to stdout. No-op outside JSON mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.json {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", event);
        let _ = stdout.flush();
    }

    fn render(&self, status: Status) -> String {
        if self.color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.ansi(),
                status.label(),
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", status.label(), width = STATUS_WIDTH)
        }
    }

    /// Time an operation; `Finished ... in 1.23s` is printed when it ends.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        let message = msg.to_string();
        self.verbose(status, &message);
        Span {
            shell: Arc::clone(self),
            start: Instant::now(),
            finished: false,
        }
    }

    /// Progress over `total` units. Draws a bar only in normal verbosity.
    pub fn progress(self: &Arc<Self>, total: u64, msg: impl Display) -> Progress {
        Progress::new(Arc::clone(self), total, msg.to_string())
    }
}

/// A timed operation started by [`Shell::span`].
pub struct Span {
    shell: Arc<Shell>,
    start: Instant,
    finished: bool,
}

impl Span {
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;
        self.shell.status(
            Status::Finished,
            format!("{} in {}", msg, format_duration(self.start.elapsed())),
        );
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            self.shell.verbose(
                Status::Finished,
                format!("in {}", format_duration(self.start.elapsed())),
            );
        }
    }
}

/// Progress counter shared by build workers.
pub struct Progress {
    shell: Arc<Shell>,
    bar: Option<ProgressBar>,
    done: AtomicU64,
}

impl Progress {
    fn new(shell: Arc<Shell>, total: u64, message: String) -> Self {
        let bar = (shell.verbosity == Verbosity::Normal && !shell.json && total > 1).then(|| {
            let bar = ProgressBar::new(total);
            if let Ok(style) =
                ProgressStyle::with_template("{msg:>12.cyan.bold} [{bar:30}] {pos}/{len}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_message(message);
            bar
        });

        Progress {
            shell,
            bar,
            done: AtomicU64::new(0),
        }
    }

    pub fn inc(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::SeqCst);
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    /// Print a status line above the bar.
    pub fn println(&self, status: Status, msg: impl Display) {
        match &self.bar {
            Some(bar) => bar.suspend(|| self.shell.status(status, msg)),
            None => self.shell.status(status, msg),
        }
    }

    /// Clear the bar and return how many units were completed.
    pub fn finish(&self) -> u64 {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        self.done.load(Ordering::SeqCst)
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        format!("{}m {:02}s", duration.as_secs() / 60, duration.as_secs() % 60)
    } else {
        format!("{:.2}s", secs)
    }
}
