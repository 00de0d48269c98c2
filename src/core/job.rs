//! Per-call job state and the subtasks that feed it.
//!
//! A `Job` is created for every non-empty `map` call. It owns the output
//! slots, the finish counter and the error aggregator; subtasks hold an
//! `Arc` to it and write into a fixed slot, so completion order never
//! affects output order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::aggregate::ErrorAggregator;
use super::error::{ComputationError, MapError};
use crate::util::cancel::{CancellationToken, Interrupt};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(0);

/// Result of a `map` call that was allowed to finish early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOutcome<R> {
    /// Every input was processed; results are in input order.
    Complete(Vec<R>),
    /// The mapper closed while the caller was waiting. Slots hold the
    /// results recorded before the close, `None` where an input had not
    /// finished.
    Partial(Vec<Option<R>>),
}

impl<R> MapOutcome<R> {
    /// Whether every input was processed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Number of inputs in the call.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Complete(values) => values.len(),
            Self::Partial(slots) => slots.len(),
        }
    }

    /// Whether the call had no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of inputs whose results are present.
    #[must_use]
    pub fn completed(&self) -> usize {
        match self {
            Self::Complete(values) => values.len(),
            Self::Partial(slots) => slots.iter().filter(|slot| slot.is_some()).count(),
        }
    }

    /// Convert into the full result vector.
    ///
    /// # Errors
    ///
    /// Returns `MapError::Closed` for a partial outcome.
    pub fn into_complete(self) -> Result<Vec<R>, MapError> {
        match self {
            Self::Complete(values) => Ok(values),
            partial @ Self::Partial(_) => Err(MapError::Closed {
                completed: partial.completed(),
                total: partial.len(),
            }),
        }
    }

    /// Convert into per-input slots, all `Some` for a complete outcome.
    #[must_use]
    pub fn into_slots(self) -> Vec<Option<R>> {
        match self {
            Self::Complete(values) => values.into_iter().map(Some).collect(),
            Self::Partial(slots) => slots,
        }
    }
}

/// What happened to a claimed subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubtaskOutcome {
    /// Result written into its slot.
    Completed,
    /// Error or panic recorded in the job's aggregator.
    Failed,
    /// Job already terminated; the function was not called or its
    /// result was dropped.
    Discarded,
}

/// A unit of queued work, type-erased so one queue serves every job.
pub(crate) trait Runnable: Send {
    /// Run the subtask on the calling worker.
    fn run(self: Box<Self>) -> SubtaskOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Running,
    Terminated,
}

struct JobState<R> {
    slots: Vec<Option<R>>,
    remaining: usize,
    status: JobStatus,
    errors: ErrorAggregator,
}

/// Why a waiting caller was released.
enum Release {
    Finished,
    Closed,
}

/// Shared state of one `map` call.
pub(crate) struct Job<R, F> {
    id: u64,
    func: F,
    state: Mutex<JobState<R>>,
    done: Condvar,
}

impl<R, F> Job<R, F> {
    /// Create a job expecting `len` subtasks.
    pub(crate) fn new(func: F, len: usize) -> Arc<Self> {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Arc::new(Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            func,
            state: Mutex::new(JobState {
                slots,
                remaining: len,
                status: JobStatus::Running,
                errors: ErrorAggregator::new(),
            }),
            done: Condvar::new(),
        })
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    fn is_terminated(&self) -> bool {
        self.state.lock().status == JobStatus::Terminated
    }

    /// Record the outcome of subtask `index` and count it as finished.
    fn complete(&self, index: usize, result: Result<R, ComputationError>) -> SubtaskOutcome {
        let mut state = self.state.lock();
        let outcome = if state.status == JobStatus::Terminated {
            SubtaskOutcome::Discarded
        } else {
            match result {
                Ok(value) => {
                    state.slots[index] = Some(value);
                    SubtaskOutcome::Completed
                }
                Err(error) => {
                    if error.is_panic() {
                        warn!(job_id = self.id, index, error = %error, "Mapped function panicked");
                    } else {
                        debug!(job_id = self.id, index, error = %error, "Mapped function failed");
                    }
                    state.errors.record(error);
                    SubtaskOutcome::Failed
                }
            }
        };

        state.remaining -= 1;
        if state.remaining == 0 && state.status == JobStatus::Running {
            state.status = JobStatus::Terminated;
            debug!(job_id = self.id, "Job terminated");
            self.done.notify_all();
        }
        outcome
    }

    /// Park until the job terminates, the mapper shuts down, or `cancel`
    /// fires.
    ///
    /// Shutdown releases the caller with whatever was recorded so far.
    /// Cancellation terminates the job so workers skip its remaining
    /// subtasks.
    pub(crate) fn wait(
        &self,
        shutdown: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Result<MapOutcome<R>, MapError> {
        let mut state = self.state.lock();
        let release = loop {
            if state.status == JobStatus::Terminated {
                break Release::Finished;
            }
            if cancel.is_cancelled() {
                state.status = JobStatus::Terminated;
                debug!(job_id = self.id, remaining = state.remaining, "Caller cancelled");
                return Err(MapError::Cancelled);
            }
            if shutdown.is_cancelled() {
                state.status = JobStatus::Terminated;
                break Release::Closed;
            }
            self.done.wait(&mut state);
        };

        let slots = std::mem::take(&mut state.slots);
        let errors = std::mem::take(&mut state.errors);
        drop(state);

        if let Some(aggregate) = errors.into_error() {
            return Err(MapError::Computation(aggregate));
        }

        let all_present = slots.iter().all(Option::is_some);
        match release {
            Release::Closed if !all_present => {
                let completed = slots.iter().filter(|slot| slot.is_some()).count();
                warn!(
                    job_id = self.id,
                    completed,
                    total = slots.len(),
                    "Mapper closed while caller was waiting; returning partial results"
                );
                Ok(MapOutcome::Partial(slots))
            }
            _ => slots
                .into_iter()
                .collect::<Option<Vec<R>>>()
                .map(MapOutcome::Complete)
                .ok_or_else(|| MapError::Internal(format!("job {} finished with empty slots", self.id))),
        }
    }
}

impl<R, F> Job<R, F>
where
    R: Send + 'static,
    F: Send + Sync + 'static,
{
    /// Have `token` wake this job's waiter when it is cancelled.
    pub(crate) fn watch(self: &Arc<Self>, token: &CancellationToken) {
        token.register(Arc::downgrade(self) as Weak<dyn Interrupt>);
    }
}

impl<R, F> Interrupt for Job<R, F>
where
    R: Send,
    F: Send + Sync,
{
    fn interrupt(&self) {
        let _state = self.state.lock();
        self.done.notify_all();
    }
}

/// One input of a job, claimed by exactly one worker.
pub(crate) struct Subtask<T, R, F> {
    job: Arc<Job<R, F>>,
    index: usize,
    input: T,
}

impl<T, R, F> Subtask<T, R, F> {
    pub(crate) const fn new(job: Arc<Job<R, F>>, index: usize, input: T) -> Self {
        Self { job, index, input }
    }
}

impl<T, R, F> Runnable for Subtask<T, R, F>
where
    T: Send,
    R: Send,
    F: Fn(T) -> anyhow::Result<R> + Send + Sync,
{
    fn run(self: Box<Self>) -> SubtaskOutcome {
        let Self { job, index, input } = *self;
        if job.is_terminated() {
            return SubtaskOutcome::Discarded;
        }

        // The function runs outside every lock.
        let result = match panic::catch_unwind(AssertUnwindSafe(|| (job.func)(input))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(ComputationError::Failed { index, source }),
            Err(payload) => Err(ComputationError::Panicked {
                index,
                message: panic_message(payload.as_ref()),
            }),
        };
        job.complete(index, result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
