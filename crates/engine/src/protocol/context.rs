//! The call context: the cancellation boundary of a single request.
//!
//! A [`CallContext`] is created per call and handed down every layer of the
//! exchange: the engine task, the body bridge with its producer task, and the
//! response body reader. Cancelling it aborts whatever is still in flight.

use std::future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::protocol::TimeoutError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that is cancelled together with `self`, but can also be
    /// cancelled on its own without affecting `self`.
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token() }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Like [`CallContext::cancelled`] but not tied to the lifetime of `self`.
    pub fn cancelled_owned(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}

/// The instant a whole exchange, response body included, has to be done by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self { at: Instant::now() + timeout, timeout }
    }

    pub(crate) fn at(&self) -> Instant {
        self.at
    }

    pub(crate) fn error(&self) -> TimeoutError {
        TimeoutError::request(self.timeout)
    }
}

/// Resolves with the request timeout once `deadline` has passed, never without one.
pub(crate) async fn expired(deadline: Option<Deadline>) -> TimeoutError {
    match deadline {
        Some(deadline) => {
            sleep_until(deadline.at).await;
            deadline.error()
        }
        None => future::pending().await,
    }
}
