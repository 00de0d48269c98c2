//! # Parallel Mapper
//!
//! An order-preserving parallel `map` over a fixed pool of worker threads.
//!
//! A `ParallelMapper` owns a set of long-lived worker threads and a single
//! FIFO of ready subtasks. Each `map` call becomes a job: one subtask per
//! input, enqueued in index order, executed by whichever worker claims it,
//! and written into a fixed output slot. The calling thread parks until the
//! job is done and then receives the outputs in input order.
//!
//! ## Key Features
//!
//! - **Order preserved**: outputs line up with inputs regardless of which
//!   worker finished first
//! - **Shared pool**: any number of threads can call `map` concurrently;
//!   their subtasks interleave through one queue, with no global lock
//!   across jobs
//! - **No lost errors**: a failing input never stops its siblings; the
//!   first captured error is reported with every other one attached
//! - **Prompt shutdown**: `close` wakes idle workers and every blocked
//!   caller, then joins all worker threads
//! - **Cooperative cancellation**: a caller can abandon a wait through a
//!   `CancellationToken`
//!
//! ## Example
//!
//! ```
//! use parallel_mapper::{MapError, ParallelMapper};
//!
//! let mapper = ParallelMapper::with_workers(2)?;
//!
//! let lengths = mapper.map(|s: &str| s.len(), vec!["a", "bb", "ccc"])?;
//! assert_eq!(lengths, vec![1, 2, 3]);
//!
//! let err = mapper
//!     .try_map(
//!         |x: i32| if x == 3 { Err(anyhow::anyhow!("bad input")) } else { Ok(x * 10) },
//!         vec![1, 2, 3, 4],
//!     )
//!     .unwrap_err();
//! assert!(matches!(err, MapError::Computation(_)));
//!
//! mapper.close();
//! # Ok::<(), MapError>(())
//! ```
//!
//! For async callers, see [`runtime::map_async`] (feature `tokio-runtime`).

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core mapping engine: jobs, queue, worker pool, errors.
pub mod core;
/// Configuration models for the mapper.
pub mod config;
/// Runtime adapters for async callers.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities: cancellation and telemetry.
pub mod util;

pub use crate::config::MapperConfig;
pub use crate::core::{
    AggregateError, ComputationError, MapError, MapOutcome, MapperStats, ParallelMapper,
};
pub use crate::util::CancellationToken;
