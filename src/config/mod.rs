//! Configuration management module
//!
//! Settings are layered: built-in defaults, then the `.env` file, then
//! `HLT_*` environment variables, then command-line flags.

pub mod env;
pub mod parser;
pub mod scenario_file;
pub mod validation;

pub use env::EnvManager;
pub use parser::{display_config_summary, load_config, ConfigParser};
pub use scenario_file::{load_scenario_file, ScenarioFileEntry};
pub use validation::{validate_config, ConfigValidator, ValidationLevel, ValidationWarning};

use crate::assertions::Thresholds;
use crate::defaults;
use crate::error::{AppError, Result};
use crate::executor::stress::StressSpec;
use crate::models::LoadConfig;
use crate::types::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

/// What the binary does with the resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// One measured run, optionally preceded by a warmup
    Single,
    /// A concurrency ramp
    Stress(StressSpec),
    /// Named runs loaded from a file
    Scenarios(PathBuf),
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Settings of the load test run itself
    pub load: LoadConfig,
    pub warmup: Option<Duration>,
    pub thresholds: Thresholds,
    pub stress: Option<StressSpec>,
    pub scenario_file: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub enable_color: bool,
    pub verbose: bool,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            load: LoadConfig::default(),
            warmup: None,
            thresholds: Thresholds::default(),
            stress: None,
            scenario_file: None,
            output_format: OutputFormat::default(),
            enable_color: defaults::DEFAULT_ENABLE_COLOR,
            verbose: false,
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn mode(&self) -> RunMode {
        if let Some(path) = &self.scenario_file {
            RunMode::Scenarios(path.clone())
        } else if let Some(spec) = &self.stress {
            RunMode::Stress(spec.clone())
        } else {
            RunMode::Single
        }
    }

    /// Reject configurations the binary cannot run
    ///
    /// Unlike the library runner, the binary never starts an unbounded run:
    /// a single run needs a request count or a duration.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        match self.mode() {
            RunMode::Scenarios(_) => {
                if self.stress.is_some() {
                    return Err(AppError::config("Stress mode cannot be combined with a scenario file"));
                }
            }
            RunMode::Stress(spec) => {
                self.load.validate()?;
                spec.validate()?;
            }
            RunMode::Single => {
                self.load.validate()?;
                if self.load.is_unbounded() {
                    return Err(AppError::config(
                        "No stop condition: set a request count (-n) or a duration (-d)",
                    ));
                }
            }
        }

        if self.warmup.map(|w| w.is_zero()).unwrap_or(false) {
            return Err(AppError::config("Warmup duration must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded() -> AppConfig {
        AppConfig {
            load: LoadConfig::new("http://localhost:8080/").with_requests(10),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.mode(), RunMode::Single);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert_eq!(config.enable_color, defaults::DEFAULT_ENABLE_COLOR);
        assert!(config.thresholds.is_empty());
    }

    #[test]
    fn test_single_run_needs_stop_condition() {
        assert!(bounded().validate().is_ok());

        let mut config = bounded();
        config.load.requests = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("No stop condition"));

        config.load.duration = Duration::from_secs(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stress_mode_ignores_stop_condition() {
        let config = AppConfig {
            load: LoadConfig::new("http://localhost/"),
            stress: Some(StressSpec::default()),
            ..AppConfig::default()
        };
        assert!(matches!(config.mode(), RunMode::Stress(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_mode_skips_url_check() {
        let config = AppConfig {
            scenario_file: Some(PathBuf::from("scenarios.json")),
            ..AppConfig::default()
        };
        assert!(matches!(config.mode(), RunMode::Scenarios(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_warmup_is_rejected() {
        let mut config = bounded();
        config.warmup = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
