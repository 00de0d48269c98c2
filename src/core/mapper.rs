//! The parallel-map engine.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::debug;

use super::error::MapError;
use super::job::{Job, MapOutcome, Runnable, Subtask};
use super::worker_pool::{MapperStats, WorkerPool};
use crate::config::MapperConfig;
use crate::util::cancel::CancellationToken;

/// Order-preserving parallel map over a fixed pool of worker threads.
///
/// Any number of threads may call `map` concurrently; their subtasks share
/// one FIFO queue and interleave in arrival order. Each call blocks until
/// all of its inputs have been processed. Calling `map` from inside a mapped
/// function blocks a worker; if every worker does so the mapper deadlocks.
///
/// The mapper is single-use: after `close` (or drop) every call fails with
/// `MapError::Shutdown`.
///
/// # Examples
///
/// ```
/// use parallel_mapper::ParallelMapper;
///
/// let mapper = ParallelMapper::with_workers(4)?;
/// let squares = mapper.map(|x: u64| x * x, vec![1, 2, 3, 4, 5])?;
/// assert_eq!(squares, vec![1, 4, 9, 16, 25]);
/// mapper.close();
/// # Ok::<(), parallel_mapper::MapError>(())
/// ```
pub struct ParallelMapper {
    config: MapperConfig,
    pool: WorkerPool,
}

impl ParallelMapper {
    /// Create a mapper and start its workers.
    ///
    /// # Errors
    ///
    /// - `MapError::InvalidConfig` if `config` is invalid (e.g. zero workers)
    /// - `MapError::Internal` if a worker thread cannot be spawned
    pub fn new(config: MapperConfig) -> Result<Self, MapError> {
        let pool = WorkerPool::start(&config)?;
        Ok(Self { config, pool })
    }

    /// Create a mapper with `worker_count` workers and default settings.
    ///
    /// # Errors
    ///
    /// Returns `MapError::InvalidConfig` if `worker_count` is 0.
    pub fn with_workers(worker_count: usize) -> Result<Self, MapError> {
        Self::new(MapperConfig::new().with_worker_count(worker_count))
    }

    /// Apply `f` to every input in parallel, returning results in input
    /// order.
    ///
    /// A panic inside `f` is captured as the failure of that input; other
    /// inputs keep running.
    ///
    /// # Errors
    ///
    /// - `MapError::Computation` if any invocation panicked
    /// - `MapError::Shutdown` if the mapper was closed before the call
    /// - `MapError::Closed` if the mapper closed before every input finished
    pub fn map<T, R, F, I>(&self, f: F, inputs: I) -> Result<Vec<R>, MapError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        self.map_outcome(
            move |input| Ok::<R, Infallible>(f(input)),
            inputs,
            &CancellationToken::new(),
        )?
        .into_complete()
    }

    /// Apply a fallible `f` to every input in parallel, returning results in
    /// input order.
    ///
    /// Every error returned by `f`, and every panic, is captured. The first
    /// one to be captured is the primary error of the returned
    /// `AggregateError`; the rest are attached as secondary errors.
    ///
    /// # Errors
    ///
    /// - `MapError::Computation` if any invocation failed
    /// - `MapError::Shutdown` if the mapper was closed before the call
    /// - `MapError::Closed` if the mapper closed before every input finished
    pub fn try_map<T, R, E, F, I>(&self, f: F, inputs: I) -> Result<Vec<R>, MapError>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<anyhow::Error>,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        self.map_outcome(f, inputs, &CancellationToken::new())?
            .into_complete()
    }

    /// The general form of `try_map`: cancellable by the caller, and
    /// returning partial results if the mapper closes mid-wait.
    ///
    /// If the mapper closes while this call is parked and no error has been
    /// captured, the call returns `MapOutcome::Partial` with the results
    /// recorded so far. If `cancel` fires while parked, the call returns
    /// `MapError::Cancelled` and the job's unclaimed subtasks are skipped.
    ///
    /// # Errors
    ///
    /// - `MapError::Computation` if any invocation failed
    /// - `MapError::Cancelled` if `cancel` fired before the job finished
    /// - `MapError::Shutdown` if the mapper was closed before the call
    pub fn map_outcome<T, R, E, F, I>(
        &self,
        f: F,
        inputs: I,
        cancel: &CancellationToken,
    ) -> Result<MapOutcome<R>, MapError>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<anyhow::Error>,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        if self.pool.is_shut_down() {
            return Err(MapError::Shutdown);
        }
        if cancel.is_cancelled() {
            return Err(MapError::Cancelled);
        }

        let inputs: Vec<T> = inputs.into_iter().collect();
        if inputs.is_empty() {
            return Ok(MapOutcome::Complete(Vec::new()));
        }

        let total = inputs.len();
        let job = Job::new(
            move |input: T| -> anyhow::Result<R> { f(input).map_err(Into::into) },
            total,
        );
        let batch: Vec<Box<dyn Runnable>> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                Box::new(Subtask::new(Arc::clone(&job), index, input)) as Box<dyn Runnable>
            })
            .collect();

        job.watch(self.pool.shutdown_token());
        job.watch(cancel);
        self.pool.submit(batch)?;
        debug!(job_id = job.id(), inputs = total, "Job submitted");

        job.wait(self.pool.shutdown_token(), cancel)
    }

    /// Stop all workers and release every blocked caller.
    ///
    /// Blocks until every worker thread has exited. A worker in the middle of
    /// a subtask finishes it first. Pending subtasks are dropped. Calling
    /// `close` more than once is harmless.
    ///
    /// When called from inside a mapped function, the calling worker is not
    /// joined: `close` returns while that worker is still finishing its
    /// subtask, and the worker exits right after. Every other worker has
    /// exited by the time `close` returns.
    pub fn close(&self) {
        self.pool.shutdown();
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_shut_down()
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Configuration the mapper was built with.
    #[must_use]
    pub const fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Current utilization statistics.
    #[must_use]
    pub fn stats(&self) -> MapperStats {
        self.pool.stats()
    }
}

impl Drop for ParallelMapper {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

impl std::fmt::Debug for ParallelMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelMapper")
            .field("worker_count", &self.pool.worker_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
