//! Tokio adapter: run blocking `map` calls on tokio's blocking pool.
//!
//! Dropping a returned future cancels its job: the blocking waiter is
//! released and unclaimed subtasks are skipped.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::debug;

use crate::core::{MapError, MapOutcome, ParallelMapper};
use crate::util::cancel::CancellationToken;

/// Cancels the call's token when the async caller goes away.
struct CancelOnDrop {
    token: CancellationToken,
    armed: bool,
}

impl CancelOnDrop {
    const fn new(token: CancellationToken) -> Self {
        Self { token, armed: true }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed && self.token.cancel() {
            debug!("Async map caller dropped; job cancelled");
        }
    }
}

/// Run `call` on the blocking pool with a token that fires if the returned
/// future is dropped before the call finishes.
async fn spawn_cancellable<R, G>(call: G) -> Result<Vec<R>, MapError>
where
    R: Send + 'static,
    G: FnOnce(&CancellationToken) -> Result<MapOutcome<R>, MapError> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let mut guard = CancelOnDrop::new(cancel.clone());

    let joined = tokio::task::spawn_blocking(move || call(&cancel)).await;
    guard.armed = false;

    let outcome =
        joined.map_err(|e| MapError::Internal(format!("blocking map task failed: {e}")))??;
    outcome.into_complete()
}

/// Run `ParallelMapper::map` without blocking an async executor thread.
///
/// The blocking call is moved to tokio's blocking thread pool via
/// `spawn_blocking`; the returned future resolves when the job finishes.
/// Dropping the future (for example by aborting its task) cancels the job.
///
/// # Errors
///
/// Same as `ParallelMapper::map`, plus `MapError::Internal` if the blocking
/// task could not be joined.
pub async fn map_async<T, R, F, I>(
    mapper: Arc<ParallelMapper>,
    f: F,
    inputs: I,
) -> Result<Vec<R>, MapError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
    I: IntoIterator<Item = T> + Send + 'static,
{
    spawn_cancellable(move |cancel| {
        mapper.map_outcome(move |input| Ok::<R, Infallible>(f(input)), inputs, cancel)
    })
    .await
}

/// Run `ParallelMapper::try_map` without blocking an async executor thread.
///
/// Dropping the future cancels the job, as with `map_async`.
///
/// # Errors
///
/// Same as `ParallelMapper::try_map`, plus `MapError::Internal` if the
/// blocking task could not be joined.
pub async fn try_map_async<T, R, E, F, I>(
    mapper: Arc<ParallelMapper>,
    f: F,
    inputs: I,
) -> Result<Vec<R>, MapError>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    I: IntoIterator<Item = T> + Send + 'static,
{
    spawn_cancellable(move |cancel| mapper.map_outcome(f, inputs, cancel)).await
}
