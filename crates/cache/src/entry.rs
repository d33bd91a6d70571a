use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Lifecycle of a cache entry. Transitions form a prefix of
/// `Pending -> Generating -> {Completed, Failed}`; `Completed` and
/// `Failed` are terminal and sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

#[derive(Debug, Default)]
struct State {
    status: Option<Status>,
    audio: Option<Arc<[u8]>>,
    error: Option<String>,
    completed_at: Option<Instant>,
}

/// One cache entry. Identity fields (`key`, `text`, `model`, `created_at`)
/// are immutable after construction; `status`/`audio`/`error` transition
/// exactly once to a terminal state, guarded by `state` and announced to
/// any number of waiters via `notify`.
///
/// The audio and error fields are written before the terminal status is
/// stored and before `notify` fires, so a waiter that wakes on `notify`
/// always observes a fully-populated terminal state.
pub struct Entry {
    pub key: String,
    pub text: String,
    pub model: String,
    pub created_at: Instant,
    state: Mutex<State>,
    notify: Notify,
}

impl Entry {
    pub fn new(key: impl Into<String>, text: impl Into<String>, model: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            text: text.into(),
            model: model.into(),
            created_at: Instant::now(),
            state: Mutex::new(State {
                status: Some(Status::Pending),
                ..Default::default()
            }),
            notify: Notify::new(),
        })
    }

    pub fn status(&self) -> Status {
        self.state.lock().status.unwrap_or(Status::Pending)
    }

    /// pending -> generating. No-op (and harmless) if called more than once.
    pub fn mark_generating(&self) {
        let mut state = self.state.lock();
        if state.status == Some(Status::Pending) {
            state.status = Some(Status::Generating);
        }
    }

    /// generating -> completed. Fires the completion signal exactly once.
    /// A no-op if the entry is already terminal (sticky terminal status).
    pub fn complete(&self, audio: Vec<u8>) {
        {
            let mut state = self.state.lock();
            if state.status.map(Status::is_terminal).unwrap_or(false) {
                return;
            }
            state.audio = Some(Arc::from(audio));
            state.completed_at = Some(Instant::now());
            state.status = Some(Status::Completed);
        }
        self.notify.notify_waiters();
    }

    /// generating -> failed. Fires the completion signal exactly once.
    /// A no-op if the entry is already terminal (sticky terminal status).
    pub fn fail(&self, error: impl Into<String>) {
        {
            let mut state = self.state.lock();
            if state.status.map(Status::is_terminal).unwrap_or(false) {
                return;
            }
            state.error = Some(error.into());
            state.completed_at = Some(Instant::now());
            state.status = Some(Status::Failed);
        }
        self.notify.notify_waiters();
    }

    pub fn audio(&self) -> Option<Arc<[u8]>> {
        self.state.lock().audio.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Waits, up to `timeout`, for the entry to reach a terminal status,
    /// then returns its audio (completed) or `None` (failed/timeout).
    /// Uses the `enable()` + re-check dance so a `notify_waiters` fired
    /// between the status check and the await is never missed.
    pub async fn wait(&self, timeout: std::time::Duration) -> Option<Arc<[u8]>> {
        if self.status().is_terminal() {
            return self.audio();
        }
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.status().is_terminal() {
            return self.audio();
        }

        if timeout.is_zero() {
            return None;
        }

        let _ = tokio::time::timeout(timeout, notified).await;
        if self.status() == Status::Completed {
            self.audio()
        } else {
            None
        }
    }
}
