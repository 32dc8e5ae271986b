//! Terminal UI and the real process launcher.
//!
//! - While a dump tool runs the user sees a spinner (only when stderr is a terminal); the tool's
//!   stderr is captured and replayed if it fails.
//! - Each pipeline stage ends with a one-line ✓/✗ summary, and the run ends with a banner.
//! - [`StageOutcome`] is plain data so tests can build and inspect it without a terminal, and
//!   [`write_summary`] takes a `&mut dyn Write` so the banner can be captured.

use std::{
    fs::File,
    io::{self, Write},
    process::{Command, Stdio},
    time::Duration,
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error::BackupError,
    runner::{CommandRunner, CommandSpec, StdoutTarget, ToolStatus},
};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille frames for the dump spinner.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Green ✓, a stage succeeded.
fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
/// Red ✗, a stage failed.  Also marks failed stages in the summary.
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
/// Cyan ✓ next to the final success banner.
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}

// ─── Stage result ─────────────────────────────────────────────────────────────

/// The outcome of one pipeline stage (`Dump` or `Sweep`).
///
/// Holds what the stage needs to report itself: the label, a short detail on
/// success, and on failure the error text plus whatever the tool wrote to
/// stderr.
#[derive(Debug)]
pub struct StageOutcome {
    /// Stage name shown in the ✓/✗ line, e.g. `"Dump"`.
    pub label: String,
    /// Whether the stage completed without error.
    pub success: bool,
    /// Short note shown next to the label, e.g. the dump path.
    pub detail: Option<String>,
    /// Captured stderr of a failed tool, replayed on failure.
    pub stderr: String,
    /// Rendered [`BackupError`], if the stage failed.
    pub error: Option<String>,
}

impl StageOutcome {
    /// A successful stage with `detail` shown dimmed after the label.
    pub fn ok(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            success: true,
            detail: Some(detail.into()),
            stderr: String::new(),
            error: None,
        }
    }

    /// A failed stage.  Keeps the tool's stderr when the error carries one.
    pub fn from_error(label: &str, err: &BackupError) -> Self {
        let stderr = match err {
            BackupError::ToolExitedNonzero { stderr, .. } => stderr.clone(),
            _ => String::new(),
        };
        Self {
            label: label.to_string(),
            success: false,
            detail: None,
            stderr,
            error: Some(err.to_string()),
        }
    }

    /// Print the ✓/✗ line; on failure also the error and captured stderr.
    pub fn print(&self) {
        if self.success {
            match &self.detail {
                Some(d) => println!(
                    "  {}  {}  {}",
                    icon_ok(),
                    style(&self.label).bold(),
                    style(d).dim()
                ),
                None => println!("  {}  {}", icon_ok(), style(&self.label).bold()),
            }
        } else {
            println!("  {}  {}", icon_err(), style(&self.label).bold());

            if let Some(ref msg) = self.error {
                eprintln!();
                eprintln!("  {} {}", style("Error:").red().bold(), msg);
            }

            if !self.stderr.is_empty() {
                eprintln!();
                eprintln!("  {} stderr:", style("►").dim());
                for line in self.stderr.lines() {
                    eprintln!("    {line}");
                }
            }
        }
    }

    /// `true` when the stage should appear in the failure summary.
    pub const fn failed(&self) -> bool {
        !self.success
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Start a steady-ticking spinner labelled `label`.
///
/// Returns a hidden bar when stderr is not a terminal so piped output and
/// logs stay free of control sequences.  Callers clear it with
/// `finish_and_clear` once the child exits.
fn make_spinner(label: &str) -> ProgressBar {
    if !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(SPINNER_CHARS),
    );
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── Process launcher ─────────────────────────────────────────────────────────

/// Runs dump tools for real, located through `PATH`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> io::Result<ToolStatus> {
        let (prog, rest) = cmd.args.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "cannot run an empty command")
        })?;

        let stdout = match &cmd.stdout {
            StdoutTarget::Null => Stdio::null(),
            StdoutTarget::File(path) => Stdio::from(File::create(path)?),
        };

        let spinner = make_spinner(&format!("Running {prog}"));

        // The redirect handle is owned by the Command and closed when it drops.
        let output = Command::new(prog)
            .args(rest)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output();
        spinner.finish_and_clear();
        let output = output?;

        Ok(ToolStatus {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ─── Summary banner ───────────────────────────────────────────────────────────

/// Print the final banner: stdout on success, stderr when a stage failed.
pub fn print_summary(outcomes: &[StageOutcome]) {
    let result = if outcomes.iter().any(StageOutcome::failed) {
        write_summary(&mut io::stderr().lock(), outcomes)
    } else {
        write_summary(&mut io::stdout().lock(), outcomes)
    };
    // Nothing useful left to report to if the terminal is gone.
    let _ = result;
}

/// Render the final banner, listing every failed stage.
pub fn write_summary(out: &mut dyn Write, outcomes: &[StageOutcome]) -> io::Result<()> {
    let failed: Vec<&StageOutcome> = outcomes.iter().filter(|o| o.failed()).collect();
    writeln!(out)?;
    if failed.is_empty() {
        writeln!(
            out,
            "  {} {}",
            icon_done(),
            style("All stages completed successfully.").cyan().bold()
        )?;
    } else {
        writeln!(out, "  {}  {}", icon_err(), style("Run failed.").red().bold())?;
        for o in &failed {
            writeln!(out, "    {} {}", icon_err(), style(&o.label).red())?;
        }
    }
    writeln!(out)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
