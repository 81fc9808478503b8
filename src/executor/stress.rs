//! Fixed-step concurrency ramp with breaking point detection

use super::Runner;
use crate::defaults;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{LoadConfig, LoadResult};
use crate::utils::duration::serde_human;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shape of a stress ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSpec {
    /// Concurrency of the first step
    pub start: usize,
    /// Concurrency added per step
    pub step: usize,
    /// Highest concurrency attempted (inclusive)
    pub max: usize,
    /// How long each step runs
    #[serde(with = "serde_human")]
    pub step_duration: Duration,
    /// Failure percentage above which a step is the breaking point
    pub failure_threshold: f64,
}

impl Default for StressSpec {
    fn default() -> Self {
        Self {
            start: defaults::DEFAULT_STRESS_START,
            step: defaults::DEFAULT_STRESS_STEP,
            max: defaults::DEFAULT_STRESS_MAX,
            step_duration: defaults::DEFAULT_STRESS_STEP_DURATION,
            failure_threshold: defaults::DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl StressSpec {
    pub fn validate(&self) -> Result<()> {
        if self.start == 0 {
            return Err(AppError::config("Stress start concurrency must be at least 1"));
        }
        if self.step == 0 {
            return Err(AppError::config("Stress step must be at least 1"));
        }
        if self.max < self.start {
            return Err(AppError::config(format!(
                "Stress max concurrency ({}) must not be below start ({})",
                self.max, self.start
            )));
        }
        if self.step_duration.is_zero() {
            return Err(AppError::config("Stress step duration must be greater than zero"));
        }
        if !(0.0..=100.0).contains(&self.failure_threshold) {
            return Err(AppError::config(format!(
                "Failure threshold must be between 0 and 100, got {}",
                self.failure_threshold
            )));
        }
        Ok(())
    }

    /// Concurrency of every step in ramp order
    pub fn levels(&self) -> Vec<usize> {
        let mut levels = Vec::new();
        let mut level = self.start;
        while level <= self.max {
            levels.push(level);
            match level.checked_add(self.step) {
                Some(next) => level = next,
                None => break,
            }
        }
        levels
    }
}

/// Outcome of one stress step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub concurrency: usize,
    pub result: LoadResult,
    /// Set on the step whose failure rate exceeded the threshold
    pub breaking_point: bool,
}

/// Stress ramp over a base configuration
pub struct StressTest<'a> {
    base: &'a LoadConfig,
    spec: &'a StressSpec,
    logger: Logger,
}

impl<'a> StressTest<'a> {
    pub fn new(base: &'a LoadConfig, spec: &'a StressSpec) -> Self {
        Self {
            base,
            spec,
            logger: Logger::disabled(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Run each step in turn until the ladder is exhausted, a step breaks or
    /// `cancel` fires
    ///
    /// Each step reuses the base configuration with its own concurrency, the
    /// step duration and no request count bound.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Vec<StressResult>> {
        self.spec.validate()?;
        self.base.validate()?;

        let levels = self.spec.levels();
        let mut results = Vec::with_capacity(levels.len());

        for concurrency in levels {
            if cancel.is_cancelled() {
                break;
            }

            let config = self
                .base
                .clone()
                .with_concurrency(concurrency)
                .with_requests(0)
                .with_duration(self.spec.step_duration);
            let runner = Runner::new(config)?.with_logger(self.logger.child("step"));
            let result = runner.run(cancel).await?;

            let failure_rate = result.failure_rate();
            let breaking_point = failure_rate > self.spec.failure_threshold;

            self.logger
                .info("Stress step finished")
                .field("concurrency", concurrency)
                .field("failure_rate", failure_rate)
                .field("breaking_point", breaking_point)
                .result_summary(&result)
                .log()
                .await;

            results.push(StressResult {
                concurrency,
                result,
                breaking_point,
            });

            if breaking_point {
                self.logger
                    .warn("Breaking point reached")
                    .field("concurrency", concurrency)
                    .field("failure_rate", failure_rate)
                    .field("threshold", self.spec.failure_threshold)
                    .log()
                    .await;
                break;
            }
        }

        Ok(results)
    }
}

/// Ramp concurrency over `base` as described by `spec`
pub async fn run_stress_test(
    cancel: &CancellationToken,
    base: &LoadConfig,
    spec: &StressSpec,
) -> Result<Vec<StressResult>> {
    StressTest::new(base, spec).run(cancel).await
}

/// The flagged step, if the ramp found one
pub fn breaking_point(results: &[StressResult]) -> Option<&StressResult> {
    results.iter().find(|r| r.breaking_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: usize, step: usize, max: usize) -> StressSpec {
        StressSpec {
            start,
            step,
            max,
            step_duration: Duration::from_millis(100),
            failure_threshold: 5.0,
        }
    }

    #[test]
    fn test_levels_include_max() {
        assert_eq!(spec(10, 10, 50).levels(), vec![10, 20, 30, 40, 50]);
        assert_eq!(spec(1, 3, 8).levels(), vec![1, 4, 7]);
        assert_eq!(spec(5, 1, 5).levels(), vec![5]);
    }

    #[test]
    fn test_levels_do_not_overflow() {
        let levels = spec(usize::MAX - 1, 5, usize::MAX).levels();
        assert_eq!(levels, vec![usize::MAX - 1]);
    }

    #[test]
    fn test_validation() {
        assert!(spec(1, 1, 1).validate().is_ok());
        assert!(spec(0, 1, 1).validate().is_err());
        assert!(spec(1, 0, 1).validate().is_err());
        assert!(spec(5, 1, 4).validate().is_err());

        let mut zero_duration = spec(1, 1, 1);
        zero_duration.step_duration = Duration::ZERO;
        assert!(zero_duration.validate().is_err());

        let mut bad_threshold = spec(1, 1, 1);
        bad_threshold.failure_threshold = 101.0;
        assert!(bad_threshold.validate().is_err());
        bad_threshold.failure_threshold = -1.0;
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_default_spec_is_valid() {
        assert!(StressSpec::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_target_breaks_on_first_step() {
        let base = LoadConfig::new("http://127.0.0.1:1/").with_timeout(Duration::from_millis(200));
        let results = run_stress_test(&CancellationToken::new(), &base, &spec(1, 1, 3))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].breaking_point);
        assert_eq!(results[0].concurrency, 1);
        assert_eq!(breaking_point(&results).map(|r| r.concurrency), Some(1));
    }

    #[tokio::test]
    async fn test_cancelled_ramp_returns_collected_steps() {
        let base = LoadConfig::new("http://127.0.0.1:1/");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = run_stress_test(&cancel, &base, &spec(1, 1, 3)).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_spec_deserializes_human_durations() {
        let spec: StressSpec = serde_json::from_str(
            r#"{"start":2,"step":2,"max":6,"step_duration":"1500ms","failure_threshold":1.5}"#,
        )
        .unwrap();
        assert_eq!(spec.step_duration, Duration::from_millis(1500));
        assert_eq!(spec.levels(), vec![2, 4, 6]);
    }
}
