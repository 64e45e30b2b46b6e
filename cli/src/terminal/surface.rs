use std::sync::{Mutex, PoisonError};

use netsift_core::surface::{
    ConfirmPrompt, InputPrompt, Notice, ResultSummary, StyledLine, Surface, Tone,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::terminal::input::{self, KeyWatcher};
use crate::terminal::{format, print, spinner};

/// Draws modals inline on the terminal, one after another.
pub struct TerminalSurface {
    watcher: Mutex<Option<KeyWatcher>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            watcher: Mutex::new(None),
        }
    }
}

impl Surface for TerminalSurface {
    fn input(&self, prompt: &InputPrompt) -> Option<String> {
        print::header(&prompt.title);
        input::read_line(&prompt.label, &prompt.initial)
    }

    fn confirm(&self, prompt: &ConfirmPrompt) -> Option<bool> {
        print::header(&prompt.title);
        for line in prompt.message.lines() {
            print::print_status(line);
        }
        input::read_confirm()
    }

    fn notice(&self, notice: &Notice) {
        print::notice(notice);
        input::wait_for_dismiss();
    }

    fn open_output(&self, title: &str, cancel: CancellationToken) {
        print::header(title);
        spinner::start();
        let watcher = KeyWatcher::start(cancel);
        if let Some(stale) = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(watcher)
        {
            stale.stop();
        }
    }

    fn append_output(&self, line: &StyledLine) {
        if line.tone == Tone::Info {
            spinner::set_status(&line.text);
        }
        if let Err(e) = spinner::write_above(&format!("{}\n", format::styled_line(line))) {
            debug!("Dropped an output line: {e}");
        }
    }

    fn close_output(&self, banner: &Notice) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.stop();
        }
        spinner::stop();
        print::notice(banner);
    }

    fn results(&self, summary: &ResultSummary) {
        print::categorized(summary);
        input::wait_for_dismiss();
    }
}
