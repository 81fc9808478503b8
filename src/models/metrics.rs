//! Per-run metric aggregation and the finalized load test result

use crate::stats::LatencySummary;
use crate::types::{ErrorClass, RequestOutcome};
use crate::utils::duration::serde_millis;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Mutable samples guarded by the recorder's single lock
#[derive(Debug, Default)]
struct Samples {
    latencies: Vec<Duration>,
    status_codes: HashMap<u16, u64>,
    errors: HashMap<ErrorClass, u64>,
}

/// Thread-safe accumulator shared by the workers of one run
///
/// Scalar counters are atomics; the latency list and both histograms sit
/// behind one mutex whose critical section is a push and two map increments.
#[derive(Debug, Default)]
pub struct ResultRecorder {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    samples: Mutex<Samples>,
}

impl ResultRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the latency buffer when the request count is known
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(Samples {
                latencies: Vec::with_capacity(capacity),
                ..Samples::default()
            }),
            ..Self::default()
        }
    }

    /// Record one completed request
    pub fn record(&self, outcome: RequestOutcome, latency: Duration, bytes_sent: u64, bytes_received: u64) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_sent.fetch_add(bytes_sent, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes_received, Ordering::Relaxed);

        // A poisoned lock only means another worker panicked mid-push; the
        // samples themselves are still consistent.
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.latencies.push(latency);
        match outcome {
            RequestOutcome::Status(code) => *samples.status_codes.entry(code).or_insert(0) += 1,
            RequestOutcome::Failed(class) => *samples.errors.entry(class).or_insert(0) += 1,
        }
    }

    /// Requests recorded so far
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Consume the recorder once every worker has joined
    pub fn finalize(self, elapsed: Duration) -> LoadResult {
        let samples = self.samples.into_inner().unwrap_or_else(|e| e.into_inner());
        let total_requests = self.total.into_inner();
        let mut latencies = samples.latencies;
        let latency = LatencySummary::from_samples(&mut latencies);

        let elapsed_secs = elapsed.as_secs_f64();
        let requests_per_sec = if elapsed_secs > 0.0 {
            total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        LoadResult {
            total_requests,
            success_count: self.success.into_inner(),
            failure_count: self.failure.into_inner(),
            elapsed,
            requests_per_sec,
            min_latency: latency.min,
            max_latency: latency.max,
            avg_latency: latency.avg,
            p50: latency.p50,
            p90: latency.p90,
            p95: latency.p95,
            p99: latency.p99,
            status_codes: samples.status_codes.into_iter().collect(),
            errors: samples.errors.into_iter().collect(),
            bytes_sent: self.bytes_sent.into_inner(),
            bytes_received: self.bytes_received.into_inner(),
        }
    }
}

/// Finalized statistics of one run; read-only once returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,

    #[serde(rename = "elapsed_ms", with = "serde_millis")]
    pub elapsed: Duration,
    pub requests_per_sec: f64,

    #[serde(rename = "min_latency_ms", with = "serde_millis")]
    pub min_latency: Duration,
    #[serde(rename = "max_latency_ms", with = "serde_millis")]
    pub max_latency: Duration,
    #[serde(rename = "avg_latency_ms", with = "serde_millis")]
    pub avg_latency: Duration,
    #[serde(rename = "p50_ms", with = "serde_millis")]
    pub p50: Duration,
    #[serde(rename = "p90_ms", with = "serde_millis")]
    pub p90: Duration,
    #[serde(rename = "p95_ms", with = "serde_millis")]
    pub p95: Duration,
    #[serde(rename = "p99_ms", with = "serde_millis")]
    pub p99: Duration,

    /// Response status code -> count
    pub status_codes: BTreeMap<u16, u64>,
    /// Transport error class -> count
    pub errors: BTreeMap<ErrorClass, u64>,

    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl LoadResult {
    /// Failures as a percentage of all requests (0 when nothing ran)
    pub fn failure_rate(&self) -> f64 {
        crate::utils::percentage(self.failure_count, self.total_requests)
    }

    /// Successes as a percentage of all requests (0 when nothing ran)
    pub fn success_rate(&self) -> f64 {
        crate::utils::percentage(self.success_count, self.total_requests)
    }

    /// Requests that failed without any HTTP response
    pub fn connection_failures(&self) -> u64 {
        self.errors.values().sum()
    }

    /// Count for one error class
    pub fn error_count(&self, class: ErrorClass) -> u64 {
        self.errors.get(&class).copied().unwrap_or(0)
    }

    /// Count for one status code
    pub fn status_count(&self, code: u16) -> u64 {
        self.status_codes.get(&code).copied().unwrap_or(0)
    }
}
