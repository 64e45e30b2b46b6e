//! The rendering side of an interaction.
//!
//! A [`Surface`] knows how to draw prompts, dialogs and the live output view
//! on whatever the operator is looking at. It is only ever called on the UI
//! thread, one modal at a time, so implementations may block while they wait
//! for keystrokes.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use netsift_common::host::{Category, HostRecord};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPrompt {
    pub title: String,
    pub label: String,
    /// Text the field starts out with.
    pub initial: String,
}

impl InputPrompt {
    pub fn new(title: &str, label: &str) -> Self {
        Self {
            title: title.to_string(),
            label: label.to_string(),
            initial: String::new(),
        }
    }

    pub fn prefilled(mut self, initial: impl Into<String>) -> Self {
        self.initial = initial.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

impl ConfirmPrompt {
    pub fn new(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title, message)
    }

    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, message)
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, title, message)
    }

    fn new(kind: NoticeKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Success,
    Warning,
    Error,
}

/// One line of the live output view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLine {
    pub tone: Tone,
    pub text: String,
}

impl StyledLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(Tone::Plain, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Tone::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Tone::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Tone::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Tone::Error, text)
    }

    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

impl fmt::Display for StyledLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Categorized hosts of a finished session, in category order.
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub session_dir: PathBuf,
    pub groups: Vec<(Category, Vec<HostRecord>)>,
}

impl ResultSummary {
    pub fn host_count(&self) -> usize {
        self.groups.iter().map(|(_, hosts)| hosts.len()).sum()
    }

    pub fn addresses(&self, category: Category) -> Vec<IpAddr> {
        self.groups
            .iter()
            .filter(|(c, _)| *c == category)
            .flat_map(|(_, hosts)| hosts.iter().map(|h| h.addr))
            .collect()
    }
}

pub trait Surface: Send + Sync + 'static {
    /// Single-line text entry. `None` when the operator backs out.
    fn input(&self, prompt: &InputPrompt) -> Option<String>;

    /// Yes/No question. `None` when the operator backs out.
    fn confirm(&self, prompt: &ConfirmPrompt) -> Option<bool>;

    /// Shows a message and returns once it has been dismissed.
    fn notice(&self, notice: &Notice);

    /// Opens the live output view. Cancelling from the view triggers `cancel`.
    fn open_output(&self, title: &str, cancel: CancellationToken);

    fn append_output(&self, line: &StyledLine);

    /// Tears the output view down, leaving `banner` as its final word.
    fn close_output(&self, banner: &Notice);

    fn results(&self, summary: &ResultSummary);
}
