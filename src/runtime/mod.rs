//! Runtime adapters for async callers.

pub mod tokio_adapter;

pub use tokio_adapter::{map_async, try_map_async};
