//! Fixed pool of worker threads draining the shared subtask queue.
//!
//! # Design Principles
//!
//! - **No polling**: idle workers park on the queue's condvar; shutdown wakes
//!   them through the cancellation token
//! - **One critical section**: the queue lock covers only push and claim
//! - **Clean shutdown**: every worker is joined, none is detached

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::MapError;
use super::job::{Runnable, SubtaskOutcome};
use super::queue::SubtaskQueue;
use crate::config::MapperConfig;
use crate::util::cancel::CancellationToken;

/// Statistics about mapper utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapperStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Subtasks waiting in the queue.
    pub queued_subtasks: usize,
    /// Subtasks currently executing.
    pub active_subtasks: u64,
    /// Non-empty `map` calls accepted.
    pub submitted_jobs: u64,
    /// Subtasks whose result was written.
    pub completed_subtasks: u64,
    /// Subtasks whose error or panic was captured.
    pub failed_subtasks: u64,
    /// Subtasks skipped or dropped because their job had already terminated.
    pub discarded_subtasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_subtasks: AtomicU64,
    pub submitted_jobs: AtomicU64,
    pub completed_subtasks: AtomicU64,
    pub failed_subtasks: AtomicU64,
    pub discarded_subtasks: AtomicU64,
}

impl PoolCounters {
    fn record(&self, outcome: SubtaskOutcome) {
        let counter = match outcome {
            SubtaskOutcome::Completed => &self.completed_subtasks,
            SubtaskOutcome::Failed => &self.failed_subtasks,
            SubtaskOutcome::Discarded => &self.discarded_subtasks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queued_subtasks: usize) -> MapperStats {
        MapperStats {
            worker_count,
            queued_subtasks,
            active_subtasks: self.active_subtasks.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            completed_subtasks: self.completed_subtasks.load(Ordering::Relaxed),
            failed_subtasks: self.failed_subtasks.load(Ordering::Relaxed),
            discarded_subtasks: self.discarded_subtasks.load(Ordering::Relaxed),
        }
    }
}

/// Worker threads plus the queue they drain.
pub(crate) struct WorkerPool {
    worker_count: usize,
    queue: Arc<SubtaskQueue>,
    /// Cancelled exactly once, by `shutdown`.
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Validate `config` and start its workers.
    ///
    /// # Errors
    ///
    /// - `MapError::InvalidConfig` if the configuration is invalid
    /// - `MapError::Internal` if a worker thread cannot be spawned; workers
    ///   already started are shut down first
    pub(crate) fn start(config: &MapperConfig) -> Result<Self, MapError> {
        config.validate().map_err(MapError::InvalidConfig)?;

        let shutdown = CancellationToken::new();
        let pool = Self {
            worker_count: config.worker_count,
            queue: SubtaskQueue::new(shutdown.clone()),
            shutdown,
            workers: Mutex::new(Vec::with_capacity(config.worker_count)),
            counters: Arc::new(PoolCounters::default()),
        };

        for worker_id in 0..config.worker_count {
            match pool.spawn_worker(worker_id, config) {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(MapError::Internal(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            "WorkerPool initialized with dedicated OS threads"
        );
        Ok(pool)
    }

    fn spawn_worker(
        &self,
        worker_id: usize,
        config: &MapperConfig,
    ) -> std::io::Result<JoinHandle<()>> {
        let mut builder =
            thread::Builder::new().name(format!("{}-{worker_id}", config.thread_name_prefix));
        if let Some(stack_size) = config.thread_stack_size {
            builder = builder.stack_size(stack_size);
        }

        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown.clone();
        let counters = Arc::clone(&self.counters);
        builder.spawn(move || worker_loop(worker_id, &queue, &shutdown, &counters))
    }

    /// Enqueue one job's subtasks, in order.
    ///
    /// # Errors
    ///
    /// Returns `MapError::Shutdown` if the pool has been shut down.
    pub(crate) fn submit(&self, batch: Vec<Box<dyn Runnable>>) -> Result<(), MapError> {
        if !self.queue.push_batch(batch) {
            return Err(MapError::Shutdown);
        }
        self.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub(crate) const fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub(crate) fn stats(&self) -> MapperStats {
        self.counters.snapshot(self.worker_count, self.queue.len())
    }

    /// Stop the workers and wait for all of them to exit.
    ///
    /// Cancelling the shutdown token wakes idle workers and every caller
    /// parked on a job. A worker in the middle of a subtask finishes it
    /// first. Only the first call does any work.
    pub(crate) fn shutdown(&self) {
        if !self.shutdown.cancel() {
            return;
        }
        info!("Shutting down worker pool");

        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!(dropped, "Dropped pending subtasks");
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        let mut joined = 0;
        for (worker_id, worker) in workers.into_iter().enumerate() {
            if worker.thread().id() == current {
                // Shutdown requested from inside a mapped function; this
                // worker exits on its next loop iteration.
                debug!(worker_id, "Skipping join of current worker thread");
                continue;
            }
            match worker.join() {
                Ok(()) => debug!(worker_id, "Worker joined successfully"),
                Err(_) => warn!(worker_id, "Worker panicked"),
            }
            joined += 1;
        }

        info!(joined, "Worker pool shut down complete");
    }
}

fn worker_loop(
    worker_id: usize,
    queue: &SubtaskQueue,
    shutdown: &CancellationToken,
    counters: &PoolCounters,
) {
    debug!(worker_id, "Worker thread started");

    while !shutdown.is_cancelled() {
        let Some(subtask) = queue.pop() else {
            break;
        };

        counters.active_subtasks.fetch_add(1, Ordering::Relaxed);
        let outcome = subtask.run();
        counters.active_subtasks.fetch_sub(1, Ordering::Relaxed);
        counters.record(outcome);
    }

    debug!(worker_id, "Worker thread exiting");
}
