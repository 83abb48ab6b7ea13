//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use rebranch_core::RunStatus;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored label for a run status.
#[must_use]
pub fn status_label(status: RunStatus) -> String {
    let text = status.to_string();
    match status {
        RunStatus::InProgress => text.blue().to_string(),
        RunStatus::Conflicted => text.red().to_string(),
        RunStatus::Failed => text.red().bold().to_string(),
        RunStatus::Completed => text.green().to_string(),
        RunStatus::Aborted => text.dimmed().to_string(),
    }
}

/// Progress of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMark {
    Done,
    Current,
    Pending,
}

/// Format a branch line in a step listing.
#[must_use]
pub fn step_line(mark: StepMark, branch: &str, onto: &str) -> String {
    match mark {
        StepMark::Done => format!("{} {} onto {}", "●".green(), branch, onto.dimmed()),
        StepMark::Current => format!("{} {} onto {}", "▶".cyan(), branch.cyan().bold(), onto),
        StepMark::Pending => format!("{} {} onto {}", "○".dimmed(), branch, onto.dimmed()),
    }
}

/// Format an old → new tip transition.
#[must_use]
pub fn tip_change(old: &str, new: &str, changed: bool) -> String {
    if changed {
        format!("{} → {}", old.dimmed(), new.green())
    } else {
        format!("{} {}", old.dimmed(), "(unchanged)".dimmed())
    }
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}
