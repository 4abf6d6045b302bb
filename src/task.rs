//! Single-fire completion handles for background work.
//!
//! Every network bound operation is started with [`spawn`], which schedules it as an
//! independent tokio task and immediately hands the caller a [`Pending`] handle. The task's
//! outcome is delivered through a oneshot channel, so each handle resolves or rejects exactly
//! once. There is no cancellation: dropping a handle discards the outcome but the task still
//! runs to completion.

use crate::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::Instrument;

/// The eventual outcome of a spawned operation.
#[derive(Debug)]
#[must_use = "a Pending handle reports the only outcome of its task"]
pub struct Pending<T> {
    outcome: oneshot::Receiver<Result<T, Error>>,
}

/// Run `operation` on its own task and return a handle to its outcome.
///
/// Must be called from within a tokio runtime.
pub fn spawn<T, F>(name: &'static str, operation: F) -> Pending<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let span = tracing::debug_span!("task", name);
    tokio::spawn(
        async move {
            let outcome = operation.await;
            if let Err(err) = &outcome {
                tracing::debug!("{name} rejected: {err}");
            }
            // The caller may have dropped its handle.
            let _ = tx.send(outcome);
        }
        .instrument(span),
    );
    Pending { outcome: rx }
}

impl<T> Pending<T> {
    /// A handle that is already rejected with `err`, for failures detected before any work
    /// could be scheduled.
    pub fn rejected(err: Error) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { outcome: rx }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Error::TaskAborted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_with_task_outcome() {
        assert_eq!(spawn("ok", async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn rejects_with_task_error() {
        let res: Result<(), Error> = spawn("err", async { Err(Error::UpdateConsumed) }).await;
        assert!(matches!(res, Err(Error::UpdateConsumed)));
    }

    #[tokio::test]
    async fn panicking_tasks_reject() {
        let res: Result<(), Error> = spawn("panic", async { panic!("boom") }).await;
        assert!(matches!(res, Err(Error::TaskAborted)));
    }

    #[tokio::test]
    async fn rejected_handles_resolve_immediately() {
        let res: Result<(), Error> = Pending::rejected(Error::TaskAborted).await;
        assert!(matches!(res, Err(Error::TaskAborted)));
    }

    #[tokio::test]
    async fn tasks_run_without_being_awaited() {
        let (tx, rx) = oneshot::channel();
        let handle = spawn("detached", async move {
            tx.send(()).unwrap();
            Ok(())
        });
        drop(handle);
        rx.await.unwrap();
    }
}
