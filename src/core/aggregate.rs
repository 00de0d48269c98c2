//! Per-job capture of computation errors.

use super::error::{AggregateError, ComputationError};

/// Collects the computation errors of one job without dropping any.
///
/// The first recorded error becomes the primary; every later one is
/// appended as a secondary error in recording order.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    primary: Option<ComputationError>,
    secondary: Vec<ComputationError>,
}

impl ErrorAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one computation error.
    pub fn record(&mut self, error: ComputationError) {
        if self.primary.is_none() {
            self.primary = Some(error);
        } else {
            self.secondary.push(error);
        }
    }

    /// Whether no error has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.primary.is_none()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.primary.is_some()) + self.secondary.len()
    }

    /// Convert into an aggregate error, or `None` if nothing was recorded.
    #[must_use]
    pub fn into_error(self) -> Option<AggregateError> {
        self.primary
            .map(|primary| AggregateError::new(primary, self.secondary))
    }
}
