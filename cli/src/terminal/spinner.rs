use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

const TICK_RATE: Duration = Duration::from_millis(100);
const TIP: &str = "Press 'q' to cancel the scan";

static ACTIVE: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// The spinner currently drawn at the bottom of the output view, if any.
pub fn active() -> Option<ProgressBar> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

pub fn start() {
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(format!("{}", TIP.italic().white()));
    pb.enable_steady_tick(TICK_RATE);

    *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
}

/// Shows `status` next to the spinner along with the cancel hint.
pub fn set_status(status: &str) {
    if let Some(pb) = active() {
        pb.set_message(format!("{status} {}", format!("({TIP})").italic().bright_black()));
    }
}

pub fn stop() {
    if let Some(pb) = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner).take() {
        pb.finish_and_clear();
    }
}

/// Writes `text` above the spinner, or straight to stdout when none is drawn.
pub fn write_above(text: &str) -> io::Result<()> {
    match active() {
        Some(pb) => pb.suspend(|| write_stdout(text)),
        None => write_stdout(text),
    }
}

fn write_stdout(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    // Raw mode leaves carriage returns to us.
    if crossterm::terminal::is_raw_mode_enabled().unwrap_or(false) {
        stdout.write_all(text.replace('\n', "\r\n").as_bytes())?;
    } else {
        stdout.write_all(text.as_bytes())?;
    }
    stdout.flush()
}
