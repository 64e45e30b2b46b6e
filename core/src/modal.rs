//! # Modal Queue Manager
//!
//! Serializes every request for operator interaction (prompts, error
//! dialogs, the live output view, result tables) so that exactly one of
//! them owns the terminal at a time.
//!
//! ```text
//! Idle --enqueue--> Active(head) --completion--> Active(next) | Idle
//! ```
//!
//! A request is a render closure. It runs on the UI thread and receives a
//! [`Completion`]; the next request is rendered only after that completion
//! has been signalled. Completion is signalled by [`Completion::done`] or by
//! dropping it, so it can never happen twice.
//!
//! A render closure that keeps its completion forever stalls the queue. That
//! is a bug in the caller; there is no watchdog.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::ui::UiDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type RenderFn = Box<dyn FnOnce(Completion) + Send + 'static>;

pub struct ModalRequest {
    id: RequestId,
    render: RenderFn,
}

struct QueueState {
    queue: VecDeque<ModalRequest>,
    active: Option<RequestId>,
    next_id: u64,
}

struct Inner {
    state: Mutex<QueueState>,
    ui: UiDispatcher,
}

/// Created once at startup and shared by reference for the lifetime of the
/// application.
#[derive(Clone)]
pub struct ModalQueueManager {
    inner: Arc<Inner>,
}

impl ModalQueueManager {
    pub fn new(ui: UiDispatcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    active: None,
                    next_id: 0,
                }),
                ui,
            }),
        }
    }

    /// Appends a request to the queue and renders it right away when nothing
    /// else is on screen. Safe to call from any thread.
    pub fn enqueue<F>(&self, render: F) -> RequestId
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let (id, next) = {
            let mut state = self.inner.lock();
            let id = RequestId(state.next_id);
            state.next_id += 1;
            state.queue.push_back(ModalRequest {
                id,
                render: Box::new(render),
            });
            debug!("Enqueued modal {id}, queue length {}", state.queue.len());

            if state.active.is_some() {
                return id;
            }
            (id, state.take_next())
        };

        if let Some(request) = next {
            self.inner.display(request);
        }
        id
    }

    /// Enqueues a request that produces a value and waits for it.
    ///
    /// Resolves to `None` when the render closure drops its [`Reply`]
    /// without answering (the operator dismissed the prompt).
    pub async fn request<T, F>(&self, render: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(Reply<T>) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(move |completion| render(Reply { tx, completion }));
        rx.await.ok()
    }

    /// Posts a display update to the UI thread without taking a queue slot.
    ///
    /// This is how background tasks touch the active surface, e.g. to append
    /// streamed tool output.
    pub fn post_update<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.ui.post(task)
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    /// Requests waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }
}

impl QueueState {
    fn take_next(&mut self) -> Option<ModalRequest> {
        let next = self.queue.pop_front();
        self.active = next.as_ref().map(|request| request.id);
        next
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display(self: &Arc<Self>, request: ModalRequest) {
        let ModalRequest { id, render } = request;
        let completion = Completion {
            inner: Arc::clone(self),
            id,
            signalled: false,
        };

        trace!("Rendering modal {id}");
        // If the UI loop is gone the closure is dropped here, which releases
        // the completion and drains the rest of the queue the same way.
        if !self.ui.post(move || render(completion)) {
            warn!("UI loop is gone, modal {id} was not shown");
        }
    }

    fn complete(self: &Arc<Self>, id: RequestId) {
        let next = {
            let mut state = self.lock();
            if state.active != Some(id) {
                warn!("Completion for modal {id} arrived while it was not active");
                return;
            }
            state.take_next()
        };

        match next {
            Some(request) => self.display(request),
            None => debug!("Modal queue is empty, manager is idle"),
        }
    }
}

/// Handed to a render closure; signals that its surface has been closed.
pub struct Completion {
    inner: Arc<Inner>,
    id: RequestId,
    signalled: bool,
}

impl Completion {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn done(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if !self.signalled {
            self.signalled = true;
            self.inner.complete(self.id);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.signalled {
            trace!("Modal {} released without explicit completion", self.id);
            self.signal();
        }
    }
}

/// A [`Completion`] that also carries the operator's answer back to the
/// task waiting in [`ModalQueueManager::request`].
pub struct Reply<T> {
    tx: oneshot::Sender<T>,
    completion: Completion,
}

impl<T> Reply<T> {
    pub fn send(self, value: T) {
        let Reply { tx, completion } = self;
        let _ = tx.send(value);
        completion.done();
    }

    /// Closes the surface without an answer.
    pub fn dismiss(self) {
        self.completion.done();
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
