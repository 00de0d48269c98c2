//! Error types for mapping operations.

use std::fmt;

use thiserror::Error;

/// A failure of the mapped function for a single input.
#[derive(Debug, Error)]
pub enum ComputationError {
    /// The function returned an error.
    #[error("input {index} failed: {source}")]
    Failed {
        /// Position of the input in the mapped sequence.
        index: usize,
        /// Error returned by the function.
        #[source]
        source: anyhow::Error,
    },
    /// The function panicked.
    #[error("input {index} panicked: {message}")]
    Panicked {
        /// Position of the input in the mapped sequence.
        index: usize,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ComputationError {
    /// Position of the failing input.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Panicked { index, .. } => *index,
        }
    }

    /// Whether the failure was a panic rather than a returned error.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Every computation error captured for one `map` call.
///
/// The first error to be captured is the primary error and is reported as
/// this error's `source()`. Errors captured afterwards are kept, in capture
/// order, as secondary errors.
#[derive(Debug)]
pub struct AggregateError {
    primary: ComputationError,
    secondary: Vec<ComputationError>,
}

impl AggregateError {
    pub(crate) const fn new(primary: ComputationError, secondary: Vec<ComputationError>) -> Self {
        Self { primary, secondary }
    }

    /// The first captured error.
    #[must_use]
    pub const fn primary(&self) -> &ComputationError {
        &self.primary
    }

    /// Errors captured after the primary, in capture order.
    #[must_use]
    pub fn secondary(&self) -> &[ComputationError] {
        &self.secondary
    }

    /// Total number of captured errors, primary included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.secondary.len()
    }

    /// Always `false`: an aggregate holds at least its primary error.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all captured errors, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &ComputationError> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    /// Indices of every failed input, in capture order.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.iter().map(ComputationError::index).collect()
    }

    /// Split into the primary and secondary errors.
    #[must_use]
    pub fn into_parts(self) -> (ComputationError, Vec<ComputationError>) {
        (self.primary, self.secondary)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary.len() {
            0 => write!(f, "{}", self.primary),
            1 => write!(f, "{} (and 1 more error)", self.primary),
            n => write!(f, "{} (and {n} more errors)", self.primary),
        }
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}

/// Errors produced by `ParallelMapper`.
#[derive(Debug, Error)]
pub enum MapError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The mapper was closed before the call was made.
    #[error("mapper has been shut down")]
    Shutdown,
    /// The caller's cancellation token fired while it was waiting.
    #[error("map call cancelled while waiting for results")]
    Cancelled,
    /// The mapper was closed while the caller was waiting and not every
    /// input had been processed.
    #[error("mapper closed before the job finished: {completed} of {total} inputs completed")]
    Closed {
        /// Inputs whose results had been recorded.
        completed: usize,
        /// Inputs in the call.
        total: usize,
    },
    /// One or more inputs failed.
    #[error("computation failed: {0}")]
    Computation(#[from] AggregateError),
    /// Internal failure (thread spawn, join of a blocking task, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl MapError {
    /// The aggregated computation errors, if this is a computation failure.
    #[must_use]
    pub const fn as_computation(&self) -> Option<&AggregateError> {
        match self {
            Self::Computation(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failed(index: usize, msg: &str) -> ComputationError {
        ComputationError::Failed {
            index,
            source: anyhow::anyhow!(msg.to_string()),
        }
    }

    #[test]
    fn test_computation_error_display() {
        assert_eq!(failed(3, "boom").to_string(), "input 3 failed: boom");
        let panic = ComputationError::Panicked {
            index: 1,
            message: "oops".into(),
        };
        assert_eq!(panic.to_string(), "input 1 panicked: oops");
        assert!(panic.is_panic());
        assert_eq!(panic.index(), 1);
    }

    #[test]
    fn test_aggregate_display_counts_secondary() {
        let single = AggregateError::new(failed(0, "a"), Vec::new());
        assert_eq!(single.to_string(), "input 0 failed: a");

        let one_more = AggregateError::new(failed(0, "a"), vec![failed(2, "b")]);
        assert_eq!(one_more.to_string(), "input 0 failed: a (and 1 more error)");

        let many = AggregateError::new(failed(0, "a"), vec![failed(2, "b"), failed(5, "c")]);
        assert_eq!(many.to_string(), "input 0 failed: a (and 2 more errors)");
        assert_eq!(many.len(), 3);
        assert_eq!(many.failed_indices(), vec![0, 2, 5]);
    }

    #[test]
    fn test_aggregate_source_is_primary() {
        let agg = AggregateError::new(failed(4, "first"), vec![failed(1, "second")]);
        let source = agg.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("input 4 failed: first"));
    }

    #[test]
    fn test_map_error_display() {
        assert_eq!(MapError::Shutdown.to_string(), "mapper has been shut down");
        assert_eq!(
            MapError::Closed {
                completed: 2,
                total: 5
            }
            .to_string(),
            "mapper closed before the job finished: 2 of 5 inputs completed"
        );
        let err = MapError::from(AggregateError::new(failed(0, "x"), Vec::new()));
        assert_eq!(err.to_string(), "computation failed: input 0 failed: x");
        assert!(err.as_computation().is_some());
    }
}
