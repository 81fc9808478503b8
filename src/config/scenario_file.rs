//! JSON scenario files
//!
//! A scenario file is a JSON array; each entry describes one named run.
//! Fields left out fall back to the settings given on the command line.
//!
//! ```json
//! [
//!   { "name": "warm cache", "url": "http://localhost:8080/", "requests": 200 },
//!   { "name": "sustained", "url": "http://localhost:8080/", "duration": "30s",
//!     "rate_limit": 100, "warmup": "5s", "thresholds": { "max_p99": "250ms" } }
//! ]
//! ```

use crate::assertions::Thresholds;
use crate::cli::parse_method;
use crate::error::{AppError, ErrorContext, Result};
use crate::executor::scenario::{Scenario, ScenarioRunner};
use crate::models::LoadConfig;
use crate::utils::duration::serde_human;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One entry of a scenario file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioFileEntry {
    pub name: String,
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub concurrency: Option<usize>,
    pub requests: Option<u64>,
    #[serde(with = "serde_human::option")]
    pub duration: Option<Duration>,
    pub rate_limit: Option<u64>,
    #[serde(with = "serde_human::option")]
    pub timeout: Option<Duration>,
    #[serde(with = "serde_human::option")]
    pub warmup: Option<Duration>,
    pub follow_redirects: Option<bool>,
    pub thresholds: Option<Thresholds>,
}

impl ScenarioFileEntry {
    /// Build the scenario on top of `base`
    ///
    /// Entry headers are appended to the base headers. The request count
    /// and duration are never inherited, so every entry must bound itself.
    pub fn into_scenario(self, base: &LoadConfig) -> Result<Scenario> {
        let context = |message: String| AppError::config(format!("Scenario '{}': {}", self.name, message));

        let mut config = base.clone().with_requests(0).with_duration(Duration::ZERO);

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(method) = &self.method {
            config.method = parse_method(method).map_err(context)?;
        }
        for (name, value) in &self.headers {
            config.headers.push((name.clone(), value.clone()));
        }
        if let Some(body) = &self.body {
            config.body = Some(Bytes::from(body.clone()));
        }
        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err(context("concurrency must be at least 1".to_string()));
            }
            config.concurrency = concurrency;
        }
        if let Some(requests) = self.requests {
            config.requests = requests;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(rate) = self.rate_limit {
            config.rate_limit = rate;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(follow) = self.follow_redirects {
            config.follow_redirects = follow;
        }

        if config.is_unbounded() {
            return Err(context("set a request count or a duration".to_string()));
        }
        config.validate().map_err(|e| context(e.to_string()))?;

        let mut scenario = Scenario::new(self.name.clone(), config);
        if let Some(warmup) = self.warmup {
            scenario = scenario.with_warmup(warmup);
        }
        if let Some(thresholds) = self.thresholds {
            thresholds.validate().map_err(|e| context(e.to_string()))?;
            if !thresholds.is_empty() {
                scenario = scenario.with_validation(thresholds.into_validation());
            }
        }

        Ok(scenario)
    }
}

/// Parse scenario file content
pub fn parse_scenarios(content: &str) -> Result<Vec<ScenarioFileEntry>> {
    let entries: Vec<ScenarioFileEntry> = serde_json::from_str(content)?;
    if entries.is_empty() {
        return Err(AppError::config("Scenario file contains no scenarios"));
    }
    Ok(entries)
}

/// Read and parse a scenario file
pub fn load_scenario_file(path: &Path) -> Result<Vec<ScenarioFileEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    parse_scenarios(&content).map_err(|e| e.context(path.display().to_string()))
}

/// Load a scenario file into a runner, in file order
pub fn build_scenario_runner(path: &Path, base: &LoadConfig) -> Result<ScenarioRunner> {
    let mut runner = ScenarioRunner::new();
    for entry in load_scenario_file(path)? {
        runner.add_scenario(entry.into_scenario(base)?)?;
    }
    Ok(runner)
}
