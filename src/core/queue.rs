//! Shared FIFO of ready subtasks.
//!
//! Every job's subtasks go through this one queue, so concurrent `map` calls
//! interleave in arrival order. The only critical section is the push or
//! the claim itself; subtasks run after the lock is released.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use super::job::Runnable;
use crate::util::cancel::{CancellationToken, Interrupt};

/// Mutex + condvar FIFO with atomic claim.
pub(crate) struct SubtaskQueue {
    entries: Mutex<VecDeque<Box<dyn Runnable>>>,
    available: Condvar,
    shutdown: CancellationToken,
}

impl SubtaskQueue {
    /// Create a queue that stops handing out work once `shutdown` fires.
    pub(crate) fn new(shutdown: CancellationToken) -> Arc<Self> {
        let queue = Arc::new(Self {
            entries: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown,
        });
        queue
            .shutdown
            .register(Arc::downgrade(&queue) as Weak<dyn Interrupt>);
        queue
    }

    /// Append a batch in order and wake up to one idle worker per entry.
    ///
    /// Returns `false` without enqueuing anything once shutdown has started.
    pub(crate) fn push_batch(&self, batch: Vec<Box<dyn Runnable>>) -> bool {
        let count = batch.len();
        {
            let mut entries = self.entries.lock();
            if self.shutdown.is_cancelled() {
                return false;
            }
            entries.extend(batch);
        }
        for _ in 0..count {
            if !self.available.notify_one() {
                break;
            }
        }
        true
    }

    /// Block until a subtask is available and claim it.
    ///
    /// Returns `None` once shutdown has been signalled, even if entries
    /// remain.
    pub(crate) fn pop(&self) -> Option<Box<dyn Runnable>> {
        let mut entries = self.entries.lock();
        loop {
            if self.shutdown.is_cancelled() {
                return None;
            }
            if let Some(subtask) = entries.pop_front() {
                return Some(subtask);
            }
            self.available.wait(&mut entries);
        }
    }

    /// Drop every pending subtask, returning how many were removed.
    pub(crate) fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain(..).collect();
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Interrupt for SubtaskQueue {
    fn interrupt(&self) {
        let _entries = self.entries.lock();
        self.available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::SubtaskOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Runnable for Recorder {
        fn run(self: Box<Self>) -> SubtaskOutcome {
            self.log.lock().push(self.id);
            SubtaskOutcome::Completed
        }
    }

    fn batch(ids: std::ops::Range<usize>, log: &Arc<Mutex<Vec<usize>>>) -> Vec<Box<dyn Runnable>> {
        ids.map(|id| {
            Box::new(Recorder {
                id,
                log: Arc::clone(log),
            }) as Box<dyn Runnable>
        })
        .collect()
    }

    #[test]
    fn test_fifo_across_batches() {
        let queue = SubtaskQueue::new(CancellationToken::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(queue.push_batch(batch(0..3, &log)));
        assert!(queue.push_batch(batch(3..5, &log)));
        assert_eq!(queue.len(), 5);

        for _ in 0..5 {
            queue.pop().unwrap().run();
        }
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_each_entry_claimed_once() {
        let queue = SubtaskQueue::new(CancellationToken::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let claimed = Arc::new(AtomicUsize::new(0));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let claimed = Arc::clone(&claimed);
                thread::spawn(move || {
                    while let Some(subtask) = queue.pop() {
                        subtask.run();
                        claimed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        assert!(queue.push_batch(batch(0..200, &log)));
        while claimed.load(Ordering::SeqCst) < 200 {
            thread::sleep(Duration::from_millis(1));
        }
        queue.shutdown.cancel();
        for consumer in consumers {
            consumer.join().unwrap();
        }

        let mut seen = log.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_shutdown_wakes_idle_consumer() {
        let shutdown = CancellationToken::new();
        let queue = SubtaskQueue::new(shutdown.clone());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop().is_none())
        };
        thread::sleep(Duration::from_millis(20));
        shutdown.cancel();
        assert!(consumer.join().unwrap());
    }

    #[test]
    fn test_push_rejected_after_shutdown() {
        let shutdown = CancellationToken::new();
        let queue = SubtaskQueue::new(shutdown.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        shutdown.cancel();
        assert!(!queue.push_batch(batch(0..2, &log)));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_clear_drops_pending() {
        let queue = SubtaskQueue::new(CancellationToken::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        queue.push_batch(batch(0..3, &log));
        assert_eq!(queue.clear(), 3);
        assert_eq!(queue.len(), 0);
        assert!(log.lock().is_empty());
    }
}
