//! Cooperative cancellation.
//!
//! A `CancellationToken` is a one-way flag shared between threads. Code that
//! parks on a condvar registers itself as a listener so that cancelling the
//! token wakes it immediately instead of waiting for a timeout or a poll.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// A parked waiter that must be woken when a token is cancelled.
///
/// Implementations lock the mutex their waiter parks under before notifying,
/// so a wake-up can never slip between the waiter's flag check and its wait.
pub(crate) trait Interrupt: Send + Sync {
    /// Wake every thread parked on this waiter.
    fn interrupt(&self);
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    listeners: Mutex<Vec<Weak<dyn Interrupt>>>,
}

/// Shared cancellation flag with wake-up support.
///
/// Clones observe the same flag. Cancellation is absorbing: once cancelled,
/// a token stays cancelled.
///
/// # Examples
///
/// ```
/// use parallel_mapper::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(token.cancel());
/// assert!(observer.is_cancelled());
/// assert!(!token.cancel());
/// ```
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `cancel` has been called on this token or any of its clones.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the token and wake every registered listener.
    ///
    /// Returns `true` if this call performed the cancellation, `false` if the
    /// token was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Listeners are taken out before waking so interrupt() never runs
        // under the listener lock.
        let listeners = std::mem::take(&mut *self.inner.listeners.lock());
        for listener in listeners.iter().filter_map(Weak::upgrade) {
            listener.interrupt();
        }
        true
    }

    /// Register a waiter to be interrupted on cancellation.
    ///
    /// Dead listeners are pruned on every registration. Registering on an
    /// already-cancelled token is a no-op: waiters check the flag before they
    /// park.
    pub(crate) fn register(&self, listener: Weak<dyn Interrupt>) {
        let mut listeners = self.inner.listeners.lock();
        if self.is_cancelled() {
            return;
        }
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(listener);
    }

    #[cfg(test)]
    fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
