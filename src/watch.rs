//! Long-poll watch handle

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};

use crate::error::{Error, Result};
use crate::types::KeysResult;

/// A pending watch on a key or subtree
///
/// The watch runs as its own task on the tokio runtime and resolves when
/// etcd reports a change (or the request fails). Awaiting the handle yields
/// the result; [`cancel`](Watch::cancel) or dropping the handle aborts the
/// request, and awaiting a cancelled watch yields [`Error::Interrupted`].
#[derive(Debug)]
pub struct Watch {
    handle: JoinHandle<Result<KeysResult>>,
}

impl Watch {
    /// Spawn `work` onto the current runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<KeysResult>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(work),
        }
    }

    /// Abort the pending request. There is no server-side cancellation.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once the watch has resolved, failed or been cancelled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for Watch {
    type Output = Result<KeysResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(joined)
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Flatten a joined task: cancellation becomes [`Error::Interrupted`], a
/// panic in the task is resumed on the caller.
pub(crate) fn joined<T>(outcome: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    match outcome {
        Ok(result) => result,
        Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
        Err(_) => Err(Error::Interrupted),
    }
}
