//! Spinners and transfer bars
//!
//! Everything here draws below the `->` step lines of `core::output` and
//! clears itself when dropped, so an aborted step leaves no half-drawn bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK: Duration = Duration::from_millis(80);

const SPINNER_TEMPLATE: &str = "     {spinner:.cyan} {msg}";
const BYTES_TEMPLATE: &str =
    "     {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BYTES_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

/// A download in flight.
///
/// Starts as a spinner; shows a byte bar when the size is known up front.
pub struct Transfer {
    pb: ProgressBar,
}

impl Transfer {
    pub fn start(label: &str, total_bytes: Option<u64>) -> Self {
        let pb = match total_bytes {
            Some(len) => ProgressBar::new(len).with_style(bytes_style()),
            None => ProgressBar::new_spinner().with_style(spinner_style()),
        };
        pb.set_message(label.to_string());
        pb.enable_steady_tick(TICK);
        Self { pb }
    }

    pub fn advance(&self, bytes: u64) {
        self.pb.inc(bytes);
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

/// Run `f` under a spinner labelled `message`.
pub fn with_spinner<T, E>(message: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let pb = ProgressBar::new_spinner().with_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(TICK);
    let result = f();
    pb.finish_and_clear();
    result
}
