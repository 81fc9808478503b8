//! HTTP Load Tester
//!
//! A concurrent HTTP load generation engine. A fixed pool of workers fires
//! requests at a single target until a request count, a duration or an
//! external cancellation stops dispatch, and the run is summarized as
//! latency percentiles, throughput and status/error histograms. Runs can be
//! sequenced as named scenarios or ramped as a stress test that detects the
//! concurrency at which the target breaks.

pub mod app;
pub mod assertions;
pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use assertions::{ThresholdViolation, Thresholds};
pub use error::{AppError, Result};
pub use executor::scenario::{Scenario, ScenarioRunner};
pub use executor::stress::{run_stress_test, StressResult, StressSpec};
pub use executor::Runner;
pub use models::{LoadConfig, LoadResult, RequestFactory, ResultRecorder};
pub use output::{ColoredFormatter, OutputCoordinator, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use tokio_util::sync::CancellationToken;
pub use types::{ErrorClass, OutputFormat, RequestOutcome};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build metadata set by the build script
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_CONCURRENCY: usize = 10;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const DEFAULT_STRESS_START: usize = 10;
    pub const DEFAULT_STRESS_STEP: usize = 10;
    pub const DEFAULT_STRESS_MAX: usize = 100;
    pub const DEFAULT_STRESS_STEP_DURATION: Duration = Duration::from_secs(10);
    /// Failure percentage above which a stress step is the breaking point
    pub const DEFAULT_FAILURE_THRESHOLD: f64 = 5.0;

    /// Prefix of the environment variables read by the config layer
    pub const ENV_PREFIX: &str = "HLT_";
}
