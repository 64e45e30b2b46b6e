use std::path::Path;

use thiserror::Error;

/// Everything that can go wrong between collecting scan parameters and
/// writing the category files.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Malformed range, empty required field or unknown interface.
    /// The operator is asked again; no state changes.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Nonzero exit, missing artifact or exceeded wall-clock ceiling.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// The operator asked to stop.
    #[error("cancelled by operator")]
    Cancelled,

    /// Directory or file creation failed. Always fatal for the session.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("a scan session is already running")]
    SessionActive,

    #[error("no live hosts were discovered")]
    EmptyHostList,
}

impl ScanError {
    pub fn tool_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for the common "doing X to <path>" context.
    pub fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("failed to {action} {}", path.display()), source)
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
