//! Handles for in-flight requests.
//!
//! Every [`Client::send`](crate::Client::send) returns an [`Outcome`]
//! immediately. It resolves exactly once, to the decoded value or to one
//! [`Error`], and can be observed by awaiting it, by blocking a thread, or
//! through callbacks.
//!
//! ```rust
//! use docstore::{Error, Outcome};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let outcome = Outcome::ready(Ok(42_u32));
//! assert!(outcome.is_resolved());
//! assert_eq!(outcome.clone().await?, 42);
//! assert_eq!(outcome.wait().await?, 42);
//! # Ok(())
//! # }
//! ```

mod page;
mod slot;

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use tokio::runtime::Handle;

pub(crate) use page::Pager;
pub use page::{Page, Paginated};
pub(crate) use slot::Completer;
use slot::Slot;

use crate::Error;

/// The pending or terminal result of one request.
///
/// Cloning is cheap; every clone observes the same terminal value.
pub struct Outcome<T: Clone> {
    slot: Slot<T>,
    request_id: Arc<str>,
    runtime: Option<Handle>,
    pager: Option<Arc<Pager<T>>>,
}

impl<T: Clone> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            request_id: Arc::clone(&self.request_id),
            runtime: self.runtime.clone(),
            pager: self.pager.clone(),
        }
    }
}

impl<T> Outcome<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an already-resolved outcome.
    pub fn ready(result: Result<T, Error>) -> Self {
        let request_id: Arc<str> = match &result {
            Err(err) => err.request_id().unwrap_or_default().into(),
            Ok(_) => "".into(),
        };
        Self {
            slot: Slot::resolved(result),
            request_id,
            runtime: None,
            pager: None,
        }
    }

    pub(crate) fn pending(
        request_id: &str,
        runtime: Handle,
        pager: Option<Arc<Pager<T>>>,
    ) -> (Self, Completer<T>) {
        let slot = Slot::new();
        let completer = Completer::new(slot.clone(), request_id);
        let outcome = Self {
            slot,
            request_id: request_id.into(),
            runtime: Some(runtime),
            pager,
        };
        (outcome, completer)
    }

    /// Returns the id sent in `X-Request-Id`. Empty for outcomes created
    /// with [`ready`](Self::ready).
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns `true` once the outcome has resolved.
    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }

    /// Returns the terminal value without waiting.
    pub fn try_result(&self) -> Option<Result<T, Error>> {
        self.slot.get()
    }

    /// Waits for the terminal value.
    pub async fn wait(&self) -> Result<T, Error> {
        self.slot.wait().await
    }

    /// Waits at most `timeout` for the terminal value.
    ///
    /// An elapsed timeout fails with [`ErrorKind::Timeout`](crate::ErrorKind::Timeout)
    /// and leaves the outcome as it is: the request keeps running and may
    /// still take effect on the server.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<T, Error> {
        tokio::time::timeout(timeout, self.slot.wait())
            .await
            .map_err(|_| self.timed_out(timeout))?
    }

    /// Blocks the current thread until the outcome resolves or `timeout`
    /// elapses.
    ///
    /// Must not be called from within an async task; use
    /// [`wait`](Self::wait) there.
    pub fn wait_blocking(&self, timeout: Option<Duration>) -> Result<T, Error> {
        match self.slot.wait_blocking(timeout) {
            Some(result) => result,
            None => Err(self.timed_out(timeout.unwrap_or_default())),
        }
    }

    /// Registers callbacks for the terminal value.
    ///
    /// Exactly one of them runs, once, on a separate completion task: on the
    /// runtime that carries the request, or the current runtime, or a
    /// dedicated thread when neither exists. If that runtime shuts down
    /// before the task runs, delivery moves to a dedicated thread.
    pub fn on_complete<S, F>(&self, on_success: S, on_failure: F)
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(Error) + Send + 'static,
    {
        let mut delivery = Delivery {
            outcome: self.clone(),
            deliver: Some(Box::new(move |result: Result<T, Error>| match result {
                Ok(value) => on_success(value),
                Err(err) => on_failure(err),
            })),
        };

        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => {
                handle.spawn(async move {
                    let result = delivery.outcome.wait().await;
                    delivery.run(result);
                });
            }
            None => delivery.run_on_thread(),
        }
    }

    fn timed_out(&self, timeout: Duration) -> Error {
        let err = Error::timeout(format!("no result within {:?}", timeout));
        if self.request_id.is_empty() {
            err
        } else {
            err.with_request_id(self.request_id.to_string())
        }
    }
}

type Deliver<T> = Box<dyn FnOnce(Result<T, Error>) + Send>;

/// Callbacks waiting for an outcome.
///
/// Dropped undelivered, as when a shut-down runtime discards the task
/// holding it, it hands the callbacks to a dedicated thread.
struct Delivery<T>
where
    T: Clone + Send + Sync + 'static,
{
    outcome: Outcome<T>,
    deliver: Option<Deliver<T>>,
}

impl<T> Delivery<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn run(&mut self, result: Result<T, Error>) {
        if let Some(deliver) = self.deliver.take() {
            deliver(result);
        }
    }

    fn run_on_thread(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            let outcome = self.outcome.clone();
            std::thread::spawn(move || deliver(outcome.wait_blocking(None)));
        }
    }
}

impl<T> Drop for Delivery<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.run_on_thread();
    }
}

impl<T> Outcome<T>
where
    T: Paginated + Clone + Send + Sync + 'static,
{
    /// Requests the page after this one.
    ///
    /// Waits for this outcome first. Returns `Ok(None)` on the last page and
    /// this outcome's error if it failed. The follow-up request reuses the
    /// decoder, headers and credentials of the original.
    pub async fn next(&self) -> Result<Option<Outcome<T>>, Error> {
        let page = self.wait().await?;
        let Some(link) = page.next_link() else {
            return Ok(None);
        };
        let Some(pager) = &self.pager else {
            return Err(Error::invalid_argument(
                "outcome was not created by a paged send and cannot follow links",
            ));
        };
        pager.follow(link).map(Some)
    }

    /// Streams this page and every page after it.
    ///
    /// The stream ends after the last page or after the first error.
    pub fn pages(self) -> impl Stream<Item = Result<T, Error>> + Send {
        stream::unfold(Some(self), |state| async move {
            let outcome = state?;
            match outcome.wait().await {
                Err(err) => Some((Err(err), None)),
                Ok(page) => {
                    let following = match outcome.next().await {
                        Ok(next) => next,
                        Err(err) => Some(Outcome::ready(Err(err))),
                    };
                    Some((Ok(page), following))
                }
            }
        })
    }
}

impl<T> IntoFuture for Outcome<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error>;
    type IntoFuture = BoxFuture<'static, Result<T, Error>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

impl<T: Clone> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("request_id", &self.request_id)
            .field("resolved", &self.slot.is_resolved())
            .field("paged", &self.pager.is_some())
            .finish()
    }
}
