//! The single UI thread.
//!
//! Terminal state is only ever touched from the thread running [`UiLoop`].
//! Every other task hands closures to it through a [`UiDispatcher`].

use tokio::sync::mpsc;
use tracing::trace;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<UiTask>,
}

pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<UiTask>,
}

pub fn channel() -> (UiDispatcher, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiDispatcher { tx }, UiLoop { rx })
}

impl UiDispatcher {
    /// Queues `task` for the UI thread. Returns `false` once the loop is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

impl UiLoop {
    /// Runs posted tasks in order until every dispatcher has been dropped.
    ///
    /// Blocks the calling thread; must not be called from inside the async runtime.
    pub fn run(mut self) {
        while let Some(task) = self.rx.blocking_recv() {
            task();
        }
        trace!("UI loop drained");
    }

    /// Spawns the loop on a dedicated OS thread.
    pub fn spawn(self) -> std::io::Result<std::thread::JoinHandle<()>> {
        std::thread::Builder::new()
            .name("ui".into())
            .spawn(move || self.run())
    }
}
