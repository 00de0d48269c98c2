//! Core mapping engine: jobs, the shared subtask queue, and the worker pool.

pub mod aggregate;
pub mod error;
pub mod job;
pub mod mapper;
pub(crate) mod queue;
pub mod worker_pool;

pub use aggregate::ErrorAggregator;
pub use error::{AggregateError, ComputationError, MapError};
pub use job::MapOutcome;
pub use mapper::ParallelMapper;
pub use worker_pool::MapperStats;
