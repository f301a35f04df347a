//! Tokio runtime construction for the host process.

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::info;

/// Configuration for the async runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads. Defaults to the number of CPU cores.
    pub worker_threads: Option<usize>,
    /// Maximum number of blocking threads.
    ///
    /// Engine calls run on the blocking pool one at a time, so a small pool is
    /// enough.
    pub max_blocking_threads: usize,
    /// Thread keep-alive duration in seconds.
    pub thread_keep_alive_secs: u64,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_blocking_threads: 4,
            thread_keep_alive_secs: 10,
            thread_name_prefix: "aquaseal-worker".to_string(),
        }
    }
}

/// Build a multi-threaded runtime from `config`.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn build(config: &RuntimeConfig) -> std::io::Result<Runtime> {
    info!("Initializing async runtime with config: {:?}", config);

    let mut builder = Builder::new_multi_thread();
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }

    builder
        .max_blocking_threads(config.max_blocking_threads)
        .thread_keep_alive(Duration::from_secs(config.thread_keep_alive_secs))
        .thread_name(config.thread_name_prefix.clone())
        .enable_all()
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert!(config.worker_threads.is_none());
        assert_eq!(config.thread_name_prefix, "aquaseal-worker");
    }

    #[test]
    fn test_build_runs_blocking_work() {
        let runtime = build(&RuntimeConfig {
            worker_threads: Some(1),
            ..RuntimeConfig::default()
        })
        .unwrap();
        let value = runtime.block_on(async {
            tokio::task::spawn_blocking(|| 21 * 2).await.unwrap()
        });
        assert_eq!(value, 42);
    }
}
