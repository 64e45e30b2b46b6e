//! Async front end to the modal queue.
//!
//! Background tasks never call a [`Surface`] directly. They go through a
//! [`Prompter`], which wraps every interaction in a modal request and
//! suspends the task until the operator has answered.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::modal::{Completion, ModalQueueManager};
use crate::surface::{ConfirmPrompt, InputPrompt, Notice, ResultSummary, StyledLine, Surface};

/// Receives the live output of a running session.
pub trait OutputSink: Send + Sync {
    fn line(&self, line: StyledLine);
}

#[derive(Clone)]
pub struct Prompter {
    modals: ModalQueueManager,
    surface: Arc<dyn Surface>,
}

impl Prompter {
    pub fn new(modals: ModalQueueManager, surface: Arc<dyn Surface>) -> Self {
        Self { modals, surface }
    }

    pub fn modals(&self) -> &ModalQueueManager {
        &self.modals
    }

    pub async fn input(&self, prompt: InputPrompt) -> Option<String> {
        let surface = Arc::clone(&self.surface);
        self.modals
            .request(move |reply| match surface.input(&prompt) {
                Some(text) => reply.send(text),
                None => reply.dismiss(),
            })
            .await
    }

    pub async fn confirm(&self, prompt: ConfirmPrompt) -> Option<bool> {
        let surface = Arc::clone(&self.surface);
        self.modals
            .request(move |reply| match surface.confirm(&prompt) {
                Some(answer) => reply.send(answer),
                None => reply.dismiss(),
            })
            .await
    }

    /// Shows `notice` and waits until the operator dismissed it.
    pub async fn notify(&self, notice: Notice) {
        let surface = Arc::clone(&self.surface);
        let _: Option<()> = self
            .modals
            .request(move |reply| {
                surface.notice(&notice);
                reply.send(());
            })
            .await;
    }

    /// Queues `notice` without waiting for it.
    pub fn post_notice(&self, notice: Notice) {
        let surface = Arc::clone(&self.surface);
        self.modals.enqueue(move |done| {
            surface.notice(&notice);
            done.done();
        });
    }

    pub async fn show_results(&self, summary: ResultSummary) {
        let surface = Arc::clone(&self.surface);
        let _: Option<()> = self
            .modals
            .request(move |reply| {
                surface.results(&summary);
                reply.send(());
            })
            .await;
    }

    /// Opens the live output view and keeps its modal slot until the
    /// returned view is closed.
    ///
    /// Resolves once the view is actually on screen, so nothing appended
    /// afterwards can land before it.
    pub async fn open_output(&self, title: &str, cancel: CancellationToken) -> Option<OutputView> {
        let (tx, rx) = oneshot::channel::<Completion>();
        let surface = Arc::clone(&self.surface);
        let title = title.to_string();

        self.modals.enqueue(move |completion| {
            surface.open_output(&title, cancel);
            // A dropped receiver releases the slot right away.
            let _ = tx.send(completion);
        });

        let completion = rx.await.ok()?;
        debug!("Output view {} is open", completion.id());
        Some(OutputView {
            modals: self.modals.clone(),
            surface: Arc::clone(&self.surface),
            completion: Some(completion),
        })
    }
}

/// Handle on the open output view. Lines are posted to the UI thread; the
/// modal slot is released by [`OutputView::close`] or on drop.
pub struct OutputView {
    modals: ModalQueueManager,
    surface: Arc<dyn Surface>,
    completion: Option<Completion>,
}

impl OutputView {
    pub fn close(mut self, banner: Notice) {
        self.finish(banner);
    }

    fn finish(&mut self, banner: Notice) {
        let Some(completion) = self.completion.take() else {
            return;
        };
        let surface = Arc::clone(&self.surface);
        self.modals.post_update(move || surface.close_output(&banner));
        // Posted after the close, so the next modal renders after it too.
        completion.done();
    }
}

impl OutputSink for OutputView {
    fn line(&self, line: StyledLine) {
        let surface = Arc::clone(&self.surface);
        self.modals.post_update(move || surface.append_output(&line));
    }
}

impl Drop for OutputView {
    fn drop(&mut self) {
        self.finish(Notice::info("Output", "Output closed"));
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
