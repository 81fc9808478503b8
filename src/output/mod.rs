//! Output formatting and display system
//!
//! Reports are rendered either as human-readable text (plain or colored,
//! with table formatting) or as JSON for machine consumption.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{
    create_table, Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat,
};

use crate::assertions::ThresholdViolation;
use crate::error::Result;
use crate::executor::stress::{breaking_point, StressResult};
use crate::models::LoadResult;
use crate::types::OutputFormat;
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter + Send + Sync> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter + Send + Sync> {
        Self::create_formatter(false, false)
    }
}

#[derive(Serialize)]
struct SingleReport<'a> {
    #[serde(flatten)]
    result: &'a LoadResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

#[derive(Serialize)]
struct StressReport<'a> {
    steps: &'a [StressResult],
    breaking_point: Option<usize>,
}

#[derive(Serialize)]
struct ScenarioReport<'a> {
    name: &'a str,
    result: &'a LoadResult,
}

/// Renders finished runs in the selected output format
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter + Send + Sync>,
    format: OutputFormat,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter + Send + Sync>, format: OutputFormat) -> Self {
        Self { formatter, format }
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    /// Render one run and its threshold verdict
    pub fn render_single(&self, result: &LoadResult, violations: &[ThresholdViolation], checked: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&SingleReport {
                result,
                violations: violations.iter().map(ToString::to_string).collect(),
            }),
            OutputFormat::Text => {
                let mut output = self.formatter.format_header("HTTP Load Test Results");
                output.push('\n');
                output.push_str(&self.formatter.format_report(result)?);
                if checked {
                    output.push('\n');
                    output.push_str(&self.formatter.format_violations(violations));
                    output.push('\n');
                }
                Ok(output)
            }
        }
    }

    /// Render a stress ramp
    pub fn render_stress(&self, steps: &[StressResult]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&StressReport {
                steps,
                breaking_point: breaking_point(steps).map(|s| s.concurrency),
            }),
            OutputFormat::Text => {
                let mut output = self.formatter.format_header("Stress Test Results");
                output.push('\n');
                output.push_str(&self.formatter.format_stress_table(steps)?);
                Ok(output)
            }
        }
    }

    /// Render scenario results in execution order
    pub fn render_scenarios(&self, results: &[(&str, &LoadResult)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let reports: Vec<ScenarioReport<'_>> = results
                    .iter()
                    .map(|(name, result)| ScenarioReport { name: *name, result: *result })
                    .collect();
                to_json(&reports)
            }
            OutputFormat::Text => self.formatter.format_scenarios(results),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result() -> LoadResult {
        let mut result = LoadResult {
            total_requests: 2,
            success_count: 2,
            elapsed: Duration::from_millis(500),
            requests_per_sec: 4.0,
            ..LoadResult::default()
        };
        result.status_codes.insert(200, 2);
        result
    }

    fn coordinator(format: OutputFormat) -> OutputCoordinator {
        OutputCoordinator::new(OutputFormatterFactory::create_plain_formatter(), format)
    }

    #[test]
    fn test_single_json_is_flat() {
        let output = coordinator(OutputFormat::Json).render_single(&result(), &[], false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["total_requests"], 2);
        assert_eq!(value["status_codes"]["200"], 2);
        assert!(value.get("violations").is_none());
    }

    #[test]
    fn test_single_json_lists_violations() {
        let violation = ThresholdViolation {
            metric: "throughput",
            limit: ">= 10.00 req/s".to_string(),
            actual: "4.00 req/s".to_string(),
        };
        let output = coordinator(OutputFormat::Json)
            .render_single(&result(), &[violation], true)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["violations"][0], "throughput was 4.00 req/s (limit >= 10.00 req/s)");
    }

    #[test]
    fn test_single_text() {
        let output = coordinator(OutputFormat::Text).render_single(&result(), &[], true).unwrap();
        assert!(output.starts_with("HTTP Load Test Results\n"));
        assert!(output.contains("All thresholds passed"));
    }

    #[test]
    fn test_stress_json() {
        let steps = vec![
            StressResult {
                concurrency: 1,
                result: result(),
                breaking_point: false,
            },
            StressResult {
                concurrency: 2,
                result: result(),
                breaking_point: true,
            },
        ];
        let output = coordinator(OutputFormat::Json).render_stress(&steps).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["breaking_point"], 2);
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_scenarios_json_keeps_order() {
        let r = result();
        let output = coordinator(OutputFormat::Json)
            .render_scenarios(&[("b", &r), ("a", &r)])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["name"], "b");
        assert_eq!(value[1]["name"], "a");
    }
}
