//! Named load test runs executed strictly in sequence
//!
//! A [`Scenario`] pairs a name with a [`LoadConfig`], an optional warmup and
//! an optional validation callback. [`ScenarioRunner`] executes them in the
//! order they were added, never overlapping, and stops at the first
//! scenario whose validation fails.

use super::Runner;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{LoadConfig, LoadResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Verdict callback run against a scenario's measured result
pub type ValidateFn = dyn Fn(&LoadResult) -> anyhow::Result<()> + Send + Sync;

/// One named step of a scenario sequence
#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub config: LoadConfig,
    /// Unmeasured run before the measured one; its result is discarded
    pub warmup: Option<Duration>,
    pub validate: Option<Arc<ValidateFn>>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("warmup", &self.warmup)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl Scenario {
    pub fn new<S: Into<String>>(name: S, config: LoadConfig) -> Self {
        Self {
            name: name.into(),
            config,
            warmup: None,
            validate: None,
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = if warmup.is_zero() { None } else { Some(warmup) };
        self
    }

    pub fn with_validation<F>(mut self, validate: F) -> Self
    where
        F: Fn(&LoadResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }
}

/// Executes scenarios in insertion order and keeps their results by name
#[derive(Debug)]
pub struct ScenarioRunner {
    scenarios: Vec<Scenario>,
    results: HashMap<String, LoadResult>,
    logger: Logger,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self {
            scenarios: Vec::new(),
            results: HashMap::new(),
            logger: Logger::disabled(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Append a scenario; names must be unique
    pub fn add_scenario(&mut self, scenario: Scenario) -> Result<()> {
        if scenario.name.trim().is_empty() {
            return Err(AppError::config("Scenario name cannot be empty"));
        }
        if self.scenarios.iter().any(|s| s.name == scenario.name) {
            return Err(AppError::config(format!(
                "Duplicate scenario name '{}'",
                scenario.name
            )));
        }
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    /// Run every scenario in order
    ///
    /// Results of the scenarios that completed stay available through
    /// [`ScenarioRunner::results`] when a later one fails. A cancelled
    /// scenario keeps its partial result but is not validated.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.results.clear();

        for scenario in &self.scenarios {
            if cancel.is_cancelled() {
                return Err(AppError::cancelled(format!(
                    "Scenario '{}' was not started",
                    scenario.name
                )));
            }

            let runner = Runner::new(scenario.config.clone())
                .map_err(|e| AppError::config(format!("Scenario '{}': {}", scenario.name, e)))?
                .with_logger(self.logger.child(&scenario.name));

            self.logger
                .info("Starting scenario")
                .field("scenario", &scenario.name)
                .field("warmup_ms", scenario.warmup.map(|w| w.as_millis() as u64))
                .log()
                .await;

            if let Some(warmup) = scenario.warmup {
                runner.warmup(cancel, warmup).await?;
                if cancel.is_cancelled() {
                    return Err(AppError::cancelled(format!(
                        "Scenario '{}' was cancelled during warmup",
                        scenario.name
                    )));
                }
            }

            let result = runner.run(cancel).await?;
            self.results.insert(scenario.name.clone(), result.clone());

            if cancel.is_cancelled() {
                return Err(AppError::cancelled(format!(
                    "Scenario '{}' was cancelled",
                    scenario.name
                )));
            }

            if let Some(validate) = &scenario.validate {
                if let Err(e) = validate(&result) {
                    let error = AppError::validation(format!(
                        "Scenario '{}' failed validation: {:#}",
                        scenario.name, e
                    ));
                    self.logger
                        .error("Scenario validation failed")
                        .field("scenario", &scenario.name)
                        .error_info(&error)
                        .log()
                        .await;
                    return Err(error);
                }
            }

            self.logger
                .info("Scenario finished")
                .field("scenario", &scenario.name)
                .result_summary(&result)
                .log()
                .await;
        }

        Ok(())
    }

    /// Copy of the results collected by the last run
    pub fn results(&self) -> HashMap<String, LoadResult> {
        self.results.clone()
    }

    /// Results paired with their names in execution order
    pub fn ordered_results(&self) -> Vec<(&str, &LoadResult)> {
        self.scenarios
            .iter()
            .filter_map(|s| self.results.get(&s.name).map(|r| (s.name.as_str(), r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LoadConfig {
        LoadConfig::new("http://127.0.0.1:1/").with_requests(1)
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut runner = ScenarioRunner::new();
        runner.add_scenario(Scenario::new("login", config())).unwrap();
        runner.add_scenario(Scenario::new("browse", config())).unwrap();

        let err = runner.add_scenario(Scenario::new("login", config())).unwrap_err();
        assert!(err.to_string().contains("login"));
        assert_eq!(runner.names(), vec!["login", "browse"]);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut runner = ScenarioRunner::new();
        assert!(runner.add_scenario(Scenario::new("  ", config())).is_err());
    }

    #[test]
    fn test_zero_warmup_is_disabled() {
        let scenario = Scenario::new("a", config()).with_warmup(Duration::ZERO);
        assert!(scenario.warmup.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut runner = ScenarioRunner::new();
        runner.add_scenario(Scenario::new("first", config())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner.run(&cancel).await.unwrap_err();
        assert_eq!(err.category(), "CANCELLED");
        assert!(err.to_string().contains("first"));
        assert!(runner.results().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_names_scenario() {
        let mut runner = ScenarioRunner::new();
        runner
            .add_scenario(Scenario::new("one", config()))
            .unwrap();
        runner
            .add_scenario(
                Scenario::new("two", config())
                    .with_validation(|r: &LoadResult| {
                        anyhow::ensure!(r.failure_count == 0, "{} requests failed", r.failure_count);
                        Ok(())
                    }),
            )
            .unwrap();
        runner.add_scenario(Scenario::new("three", config())).unwrap();

        let err = runner.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.category(), "VALIDATION");
        assert!(err.to_string().contains("'two'"));

        let results = runner.results();
        assert_eq!(results.len(), 2);
        assert!(results.contains_key("one"));
        assert!(results.contains_key("two"));
        assert!(!results.contains_key("three"));
    }
}
