//! Terminal reporting for install runs
//!
//! Status lines go to stdout, warnings and errors to stderr. Spinners and
//! download bars live in `helpers::progress`.
//!
//! ```text
//! ==> Installing glib2
//!   -> resolving
//!      found glib2-2.76.4_1+x11.darwin_21.arm64.tbz2
//!   -> downloading
//! ==> python311 skipped (blacklisted)
//! ```

use owo_colors::OwoColorize;
use std::fmt::Display;

/// Package-level header (blue, bold)
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Pipeline step of the current package (cyan arrow)
pub fn step(state: impl Display) {
    println!("  {} {}", "->".cyan(), state);
}

/// Indented detail under a step (dimmed)
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Completed package or run (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// A package passed over without network access, e.g. "python311 skipped (blacklisted)"
pub fn skip(name: &str, reason: impl Display) {
    println!("{} {} {}", "==>".dimmed(), name.dimmed(), reason.dimmed());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}
