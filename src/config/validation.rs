//! Advisory configuration checks
//!
//! Hard errors live in [`AppConfig::validate`]; this module only reports
//! settings that are legal but likely to produce misleading numbers.

use super::{AppConfig, RunMode};
use crate::error::Result;
use crate::utils::format_duration;
use colored::Colorize;
use std::time::Duration;

/// Workers beyond this count usually exhaust file descriptors first
const HIGH_CONCURRENCY: usize = 1000;

/// Runs shorter than this give unstable percentiles
const SHORT_RUN: Duration = Duration::from_secs(1);

/// Configuration validator with advisory rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect advisory warnings
    pub fn validate_comprehensive(config: &AppConfig) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        if let RunMode::Scenarios(_) = config.mode() {
            return Ok(warnings);
        }

        warnings.extend(Self::validate_target(config));
        warnings.extend(Self::validate_load_shape(config));
        warnings.extend(Self::validate_mode(config));

        Ok(warnings)
    }

    fn validate_target(config: &AppConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Ok(parsed) = url::Url::parse(&config.load.url) {
            let local = match parsed.host() {
                Some(url::Host::Domain(domain)) => domain == "localhost",
                Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            };
            if local {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Target '{}' is on this machine; the load generator competes with it for CPU",
                        config.load.url
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_load_shape(config: &AppConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let load = &config.load;
        let concurrency = load.effective_concurrency();

        if concurrency > HIGH_CONCURRENCY {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Concurrency of {} may exhaust file descriptors (check `ulimit -n`)",
                    concurrency
                ),
            ));
        }

        if load.requests > 0 && load.requests < concurrency as u64 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Only {} requests for {} workers; some workers will stay idle",
                    load.requests, concurrency
                ),
            ));
        }

        if load.requests > 0 && !load.duration.is_zero() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Both a request count and a duration are set; whichever is reached first stops the run"
                    .to_string(),
            ));
        }

        if !load.duration.is_zero() {
            if load.effective_timeout() > load.duration {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Timeout {} is longer than the run duration {}; requests still pending at the deadline are counted as timeouts",
                        format_duration(load.effective_timeout()),
                        format_duration(load.duration)
                    ),
                ));
            }
            if load.duration < SHORT_RUN {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Run duration {} may be too short for stable percentiles",
                        format_duration(load.duration)
                    ),
                ));
            }
        }

        if load.rate_limit > 0 {
            // A worker cannot exceed one request per timeout period when the
            // target stalls, so this is the floor of what the pool sustains.
            let worst_case_rps = concurrency as f64 / load.effective_timeout().as_secs_f64();
            if (load.rate_limit as f64) > worst_case_rps {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Rate limit of {} req/s needs responses faster than {} with {} workers",
                        load.rate_limit,
                        format_duration(Duration::from_secs_f64(concurrency as f64 / load.rate_limit as f64)),
                        concurrency
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_mode(config: &AppConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let RunMode::Stress(spec) = config.mode() {
            if config.load.requests > 0 || !config.load.duration.is_zero() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    "Request count and duration are ignored in stress mode; each step runs for the step duration"
                        .to_string(),
                ));
            }
            if config.warmup.is_some() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    "Warmup is ignored in stress mode".to_string(),
                ));
            }
            if spec.failure_threshold == 0.0 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    "Failure threshold is 0%; a single failed request marks the breaking point".to_string(),
                ));
            }
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            let level = match self.level {
                ValidationLevel::Info => self.level.as_str().blue().bold(),
                ValidationLevel::Warning => self.level.as_str().yellow().bold(),
            };
            format!("[{}] {}", level, self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &AppConfig) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
