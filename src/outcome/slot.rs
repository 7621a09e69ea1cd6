//! Single-assignment completion slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use crate::Error;

struct SlotState<T> {
    terminal: Mutex<Option<Result<T, Error>>>,
    ready: Condvar,
    notify: Notify,
}

/// Holds the terminal result of one request.
///
/// Written at most once; any number of observers may wait on it, either
/// asynchronously or by blocking a thread.
pub(crate) struct Slot<T> {
    state: Arc<SlotState<T>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(SlotState {
                terminal: Mutex::new(None),
                ready: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    pub(crate) fn resolved(result: Result<T, Error>) -> Self {
        let slot = Self::new();
        slot.complete(result);
        slot
    }

    /// Stores the terminal result. Returns `false`, leaving the slot
    /// untouched, if it was already resolved.
    pub(crate) fn complete(&self, result: Result<T, Error>) -> bool {
        {
            let mut terminal = self.state.terminal.lock();
            if terminal.is_some() {
                return false;
            }
            *terminal = Some(result);
        }
        self.state.ready.notify_all();
        self.state.notify.notify_waiters();
        true
    }

    pub(crate) fn get(&self) -> Option<Result<T, Error>> {
        self.state.terminal.lock().clone()
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.state.terminal.lock().is_some()
    }

    pub(crate) async fn wait(&self) -> Result<T, Error> {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not lost.
            notified.as_mut().enable();
            if let Some(result) = self.get() {
                return result;
            }
            notified.await;
        }
    }

    /// Blocks the calling thread. Returns `None` if `timeout` elapses first.
    pub(crate) fn wait_blocking(&self, timeout: Option<Duration>) -> Option<Result<T, Error>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut terminal = self.state.terminal.lock();
        loop {
            if let Some(result) = terminal.as_ref() {
                return Some(result.clone());
            }
            match deadline {
                Some(deadline) => {
                    if self.state.ready.wait_until(&mut terminal, deadline).timed_out() {
                        return terminal.clone();
                    }
                }
                None => self.state.ready.wait(&mut terminal),
            }
        }
    }
}

/// Write side of a [`Slot`], owned by the exchange task.
///
/// Dropping it unresolved, for example because the task was cancelled
/// during runtime shutdown, resolves the slot with a `Transport` error so
/// waiters never hang.
pub(crate) struct Completer<T: Clone> {
    slot: Slot<T>,
    request_id: String,
}

impl<T: Clone> Completer<T> {
    pub(crate) fn new(slot: Slot<T>, request_id: impl Into<String>) -> Self {
        Self {
            slot,
            request_id: request_id.into(),
        }
    }

    pub(crate) fn complete(&self, result: Result<T, Error>) -> bool {
        self.slot.complete(result)
    }
}

impl<T: Clone> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.slot.is_resolved() {
            self.slot.complete(Err(Error::transport("request abandoned before completion")
                .with_request_id(self.request_id.clone())));
        }
    }
}
