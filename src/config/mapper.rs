//! Mapper configuration.

use serde::{Deserialize, Serialize};

/// Environment variable holding the worker count.
pub const ENV_WORKERS: &str = "PARALLEL_MAPPER_WORKERS";
/// Environment variable holding the worker thread name prefix.
pub const ENV_THREAD_PREFIX: &str = "PARALLEL_MAPPER_THREAD_PREFIX";
/// Environment variable holding the worker stack size in bytes.
pub const ENV_STACK_SIZE: &str = "PARALLEL_MAPPER_STACK_SIZE";

/// Configuration for a `ParallelMapper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Number of worker threads. Must be greater than 0.
    pub worker_count: usize,
    /// Worker threads are named `{prefix}-{id}`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads; the platform default if unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_name_prefix: "pm-worker".into(),
            thread_stack_size: None,
        }
    }
}

impl MapperConfig {
    /// Default configuration: one worker per logical CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading a `.env`
    /// file first if one exists. Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a message if a value is malformed or the result is invalid.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, String>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_WORKERS) {
            cfg.worker_count = raw
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_WORKERS}={raw:?}: {e}"))?;
        }
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            cfg.thread_name_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_STACK_SIZE) {
            let bytes = raw
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_STACK_SIZE}={raw:?}: {e}"))?;
            cfg.thread_stack_size = Some(bytes);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
