//! Load test execution engine
//!
//! This module contains the execution components:
//! - [`Runner`]: one run of a fixed worker pool against a single target
//! - [`scenario`]: named runs executed strictly in sequence
//! - [`stress`]: a fixed-step concurrency ramp that finds the breaking point

pub mod dispatch;
pub mod request;
pub mod scenario;
pub mod stress;

pub use dispatch::{DispatchToken, StopReason};
pub use request::classify_error;

use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{LoadConfig, LoadResult, ResultRecorder};
use dispatch::TokenQueue;
use futures::future::join_all;
use request::{RequestExecutor, RequestTemplate};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Latency samples pre-allocated at most, whatever the request count
const MAX_PREALLOCATED_SAMPLES: u64 = 1_000_000;

/// Executes load test runs for one configuration
///
/// The HTTP client and its connection pool are built once and reused by
/// every call to [`Runner::run`].
pub struct Runner {
    config: LoadConfig,
    client: Client,
    logger: Logger,
}

impl Runner {
    /// Validate the configuration and build the shared client
    pub fn new(config: LoadConfig) -> Result<Self> {
        config.validate()?;
        let client = request::build_client(&config)?;

        Ok(Self {
            config,
            client,
            logger: Logger::disabled(),
        })
    }

    /// Report lifecycle events through `logger`
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Run until the request count is dispatched, the duration elapses or
    /// `cancel` fires, whichever comes first
    ///
    /// Requests still on the wire when the run stops are cut short and
    /// recorded as failures, so `run` returns promptly after its deadline.
    /// A cancelled run still returns the statistics collected so far.
    ///
    /// Fails with a test execution error if a worker task panics, since the
    /// collected numbers would then be incomplete.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<LoadResult> {
        self.execute(cancel, self.config.requests, self.config.duration)
            .await
    }

    /// Run for `duration` with no request count bound, sharing the
    /// connection pool with later measured runs
    pub async fn warmup(&self, cancel: &CancellationToken, duration: Duration) -> Result<LoadResult> {
        if duration.is_zero() {
            return Err(AppError::config("Warmup duration must be greater than zero"));
        }
        self.execute(cancel, 0, duration).await
    }

    async fn execute(&self, cancel: &CancellationToken, requests: u64, duration: Duration) -> Result<LoadResult> {
        let template = RequestTemplate::from_config(&self.config)?;
        let concurrency = self.config.effective_concurrency();
        let correlation_id = Logger::new_correlation_id();

        self.logger
            .debug("Starting load test run")
            .correlation_id(&correlation_id)
            .field("target", &self.config.url)
            .field("method", self.config.method.as_str())
            .field("concurrency", concurrency)
            .field("requests", requests)
            .field("duration_ms", duration.as_millis() as u64)
            .field("rate_limit", self.config.rate_limit)
            .log()
            .await;

        let capacity = requests.min(MAX_PREALLOCATED_SAMPLES) as usize;
        let recorder = Arc::new(ResultRecorder::with_capacity(capacity));

        // `stop` ends dispatch and in-flight requests (deadline or caller);
        // `shutdown` additionally retires the helper tasks once dispatch is
        // over for any reason.
        let stop = cancel.child_token();
        let shutdown = stop.child_token();

        let executor = Arc::new(
            RequestExecutor::new(self.client.clone(), template, Arc::clone(&recorder))
                .with_stop(stop.clone(), cancel.clone()),
        );

        let start = Instant::now();

        let (sender, receiver) = mpsc::channel(concurrency);
        let queue: TokenQueue = Arc::new(Mutex::new(receiver));
        let workers: Vec<_> = (0..concurrency)
            .map(|_| tokio::spawn(dispatch::worker_loop(Arc::clone(&queue), Arc::clone(&executor))))
            .collect();
        drop(queue);
        drop(executor);

        let mut helpers = Vec::new();
        if !duration.is_zero() {
            helpers.push(dispatch::spawn_deadline(
                duration,
                stop.clone(),
                shutdown.clone(),
            ));
        }
        let gate = self.config.rate_interval().map(|interval| {
            let (permits, handle) = dispatch::spawn_rate_gate(interval, shutdown.clone());
            helpers.push(handle);
            permits
        });

        let (dispatched, reason) =
            dispatch::dispatch(sender, requests, gate, &stop, cancel).await;
        shutdown.cancel();

        let failed: Vec<String> = join_all(workers)
            .await
            .into_iter()
            .filter_map(|outcome| outcome.err().map(|e| e.to_string()))
            .collect();
        join_all(helpers).await;

        if let Some(first) = failed.first() {
            self.logger
                .error("Worker task failed")
                .correlation_id(&correlation_id)
                .field("failed_workers", failed.len())
                .field("error", first.as_str())
                .log()
                .await;
            return Err(AppError::test_execution(format!(
                "{} of {} workers failed: {}",
                failed.len(),
                concurrency,
                first
            )));
        }

        let elapsed = start.elapsed();
        let recorder = Arc::try_unwrap(recorder)
            .map_err(|_| AppError::internal("Result recorder still shared after all workers joined"))?;
        let result = recorder.finalize(elapsed);

        self.logger
            .info("Load test run finished")
            .correlation_id(&correlation_id)
            .field("stop_reason", reason.as_str())
            .field("dispatched", dispatched)
            .result_summary(&result)
            .log()
            .await;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Runner::new(LoadConfig::new("")).is_err());
        assert!(Runner::new(LoadConfig::new("ftp://example.com")).is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_header_value() {
        let runner = Runner::new(
            LoadConfig::new("http://127.0.0.1:1/")
                .with_requests(1)
                .with_header("X-Bad", "a\r\nb"),
        )
        .unwrap();
        let err = runner.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.category(), "CONFIG");
    }

    #[tokio::test]
    async fn test_precancelled_run_returns_empty_result() {
        let runner = Runner::new(LoadConfig::new("http://127.0.0.1:1/").with_requests(100)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = runner.run(&cancel).await.unwrap();
        assert_eq!(result.total_requests, 0);
    }

    #[tokio::test]
    async fn test_refused_requests_are_counted() {
        let runner = Runner::new(
            LoadConfig::new("http://127.0.0.1:1/")
                .with_concurrency(2)
                .with_requests(4)
                .with_timeout(Duration::from_millis(500)),
        )
        .unwrap();

        let result = runner.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(result.total_requests, 4);
        assert_eq!(result.failure_count, 4);
        assert_eq!(result.connection_failures(), 4);
    }

    #[tokio::test]
    async fn test_panicking_worker_fails_the_run() {
        let config = LoadConfig::default()
            .with_requests(5)
            .with_concurrency(2)
            .with_request_factory(|_: &Client, _: u64| -> Result<reqwest::Request> {
                panic!("factory exploded")
            });
        let runner = Runner::new(config).unwrap();

        let err = runner.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.category(), "TEST");
        assert_eq!(err.exit_code(), 6);
    }
}
