//! Pass/fail thresholds evaluated against a finished run

use crate::error::{AppError, Result};
use crate::models::LoadResult;
use crate::utils::{duration::serde_human, format_duration};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Limits a run must stay within; unset limits are not checked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Highest acceptable 99th percentile latency
    #[serde(with = "serde_human::option", skip_serializing_if = "Option::is_none")]
    pub max_p99: Option<Duration>,
    /// Lowest acceptable throughput in requests per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rps: Option<f64>,
    /// Highest acceptable failure percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failure_rate: Option<f64>,
}

/// One threshold a run did not meet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdViolation {
    pub metric: &'static str,
    pub limit: String,
    pub actual: String,
}

impl fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} was {} (limit {})", self.metric, self.actual, self.limit)
    }
}

impl Thresholds {
    pub fn is_empty(&self) -> bool {
        self.max_p99.is_none() && self.min_rps.is_none() && self.max_failure_rate.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rps) = self.min_rps {
            if !rps.is_finite() || rps < 0.0 {
                return Err(AppError::config(format!("Minimum req/s must be non-negative, got {}", rps)));
            }
        }
        if let Some(rate) = self.max_failure_rate {
            if !(0.0..=100.0).contains(&rate) {
                return Err(AppError::config(format!(
                    "Maximum failure rate must be between 0 and 100, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }

    /// Every threshold `result` violates, in a fixed order
    pub fn check(&self, result: &LoadResult) -> Vec<ThresholdViolation> {
        let mut violations = Vec::new();

        if let Some(max_p99) = self.max_p99 {
            if result.p99 > max_p99 {
                violations.push(ThresholdViolation {
                    metric: "p99 latency",
                    limit: format!("<= {}", format_duration(max_p99)),
                    actual: format_duration(result.p99),
                });
            }
        }

        if let Some(min_rps) = self.min_rps {
            if result.requests_per_sec < min_rps {
                violations.push(ThresholdViolation {
                    metric: "throughput",
                    limit: format!(">= {:.2} req/s", min_rps),
                    actual: format!("{:.2} req/s", result.requests_per_sec),
                });
            }
        }

        if let Some(max_rate) = self.max_failure_rate {
            let rate = result.failure_rate();
            if rate > max_rate {
                violations.push(ThresholdViolation {
                    metric: "failure rate",
                    limit: format!("<= {:.2}%", max_rate),
                    actual: format!("{:.2}%", rate),
                });
            }
        }

        violations
    }

    /// Turn the thresholds into an error when any is violated
    pub fn enforce(&self, result: &LoadResult) -> Result<()> {
        let violations = self.check(result);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(join_violations(&violations)))
        }
    }

    /// Scenario validation callback enforcing these thresholds
    pub fn into_validation(self) -> impl Fn(&LoadResult) -> anyhow::Result<()> + Send + Sync + 'static {
        move |result: &LoadResult| {
            let violations = self.check(result);
            if violations.is_empty() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(join_violations(&violations)))
            }
        }
    }
}

fn join_violations(violations: &[ThresholdViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
