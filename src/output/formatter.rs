//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::assertions::ThresholdViolation;
use crate::error::Result;
use crate::executor::stress::{breaking_point, StressResult};
use crate::models::LoadResult;
use crate::utils::{format_bytes, format_duration};

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> String;

    /// Format the full report of one run
    fn format_report(&self, result: &LoadResult) -> Result<String>;

    /// Format the per-step table of a stress ramp
    fn format_stress_table(&self, steps: &[StressResult]) -> Result<String>;

    /// Format one report per scenario, in execution order
    fn format_scenarios(&self, results: &[(&str, &LoadResult)]) -> Result<String> {
        let mut output = String::new();
        for (name, result) in results {
            output.push_str(&self.format_header(&format!("Scenario: {}", name)));
            output.push('\n');
            output.push_str(&self.format_report(result)?);
            output.push('\n');
        }
        Ok(output)
    }

    /// Format threshold violations
    fn format_violations(&self, violations: &[ThresholdViolation]) -> String;

    /// Format error messages
    fn format_error(&self, error: &str) -> String;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> String;

    /// Format success messages
    fn format_success(&self, message: &str) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show empty sections and extra detail
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: 0,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// One labelled line of a report section
pub(crate) type Line = (&'static str, String);

pub(crate) fn summary_lines(result: &LoadResult) -> Vec<Line> {
    vec![
        ("Total requests", result.total_requests.to_string()),
        (
            "Successful",
            format!("{} ({:.2}%)", result.success_count, result.success_rate()),
        ),
        (
            "Failed",
            format!("{} ({:.2}%)", result.failure_count, result.failure_rate()),
        ),
        ("Elapsed", format_duration(result.elapsed)),
        ("Requests/sec", format!("{:.2}", result.requests_per_sec)),
    ]
}

pub(crate) fn latency_lines(result: &LoadResult) -> Vec<Line> {
    vec![
        ("Min", format_duration(result.min_latency)),
        ("Avg", format_duration(result.avg_latency)),
        ("p50", format_duration(result.p50)),
        ("p90", format_duration(result.p90)),
        ("p95", format_duration(result.p95)),
        ("p99", format_duration(result.p99)),
        ("Max", format_duration(result.max_latency)),
    ]
}

pub(crate) fn throughput_lines(result: &LoadResult) -> Vec<Line> {
    let secs = result.elapsed.as_secs_f64();
    let per_sec = |bytes: u64| {
        if secs > 0.0 {
            format!("{}/s", format_bytes((bytes as f64 / secs) as u64))
        } else {
            "-".to_string()
        }
    };
    vec![
        (
            "Bytes sent",
            format!("{} ({})", format_bytes(result.bytes_sent), per_sec(result.bytes_sent)),
        ),
        (
            "Bytes received",
            format!("{} ({})", format_bytes(result.bytes_received), per_sec(result.bytes_received)),
        ),
    ]
}

/// Status code histogram rows as (code, count)
pub(crate) fn status_rows(result: &LoadResult) -> Vec<(u16, u64)> {
    result.status_codes.iter().map(|(code, count)| (*code, *count)).collect()
}

/// Error class histogram rows as (key, count)
pub(crate) fn error_rows(result: &LoadResult) -> Vec<(&'static str, u64)> {
    result
        .errors
        .iter()
        .map(|(class, count)| (class.as_str(), *count))
        .collect()
}

pub(crate) fn stress_table_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::new("Concurrency", Alignment::Right),
            Column::new("Requests", Alignment::Right),
            Column::new("Failed", Alignment::Right),
            Column::new("Failure %", Alignment::Right),
            Column::new("Req/s", Alignment::Right),
            Column::new("p50", Alignment::Right),
            Column::new("p99", Alignment::Right),
            Column::new("Verdict", Alignment::Left),
        ],
        show_borders,
    }
}

pub(crate) fn stress_row(step: &StressResult) -> RowData {
    let result = &step.result;
    vec![
        step.concurrency.to_string(),
        result.total_requests.to_string(),
        result.failure_count.to_string(),
        format!("{:.2}", result.failure_rate()),
        format!("{:.2}", result.requests_per_sec),
        format_duration(result.p50),
        format_duration(result.p99),
        if step.breaking_point { "BREAKING POINT".to_string() } else { "ok".to_string() },
    ]
}

/// Closing sentence of a stress report
pub(crate) fn stress_verdict(steps: &[StressResult]) -> String {
    match (breaking_point(steps), steps.last()) {
        (Some(step), _) => format!(
            "Breaking point at concurrency {} ({:.2}% failed)",
            step.concurrency,
            step.result.failure_rate()
        ),
        (None, Some(last)) => format!("No breaking point up to concurrency {}", last.concurrency),
        (None, None) => "No stress steps were run".to_string(),
    }
}

/// Width needed to align labels of `lines`
pub(crate) fn label_width(lines: &[Line]) -> usize {
    lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1
}

/// Render rows into an aligned text table
pub fn create_table(format: &TableFormat, rows: &[RowData]) -> String {
    let widths = column_widths(format, rows);
    let mut output = String::new();

    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }
    let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
    output.push_str(&create_row(&headers, &widths, format));
    output.push('\n');
    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }

    for row in rows {
        output.push_str(&create_row(row, &widths, format));
        output.push('\n');
    }

    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }

    output
}

fn column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .fold(column.min_width.max(column.header.len()), usize::max)
        })
        .collect()
}

fn create_row(data: &[String], widths: &[usize], format: &TableFormat) -> String {
    let mut row = String::new();

    if format.show_borders {
        row.push('|');
    }

    for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
        let alignment = format
            .columns
            .get(idx)
            .map(|c| c.alignment)
            .unwrap_or(Alignment::Left);

        if format.show_borders {
            row.push(' ');
        }
        row.push_str(&align_text(cell, width, alignment));
        if format.show_borders {
            row.push_str(" |");
        } else {
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => format!("{:<width$}", text, width = width),
        Alignment::Right => format!("{:>width$}", text, width = width),
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn section(&self, output: &mut String, title: &str, lines: &[Line]) {
        let width = label_width(lines);
        output.push_str(title);
        output.push_str(":\n");
        for (label, value) in lines {
            output.push_str(&format!("  {:<width$} {}\n", format!("{}:", label), value, width = width));
        }
        output.push('\n');
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> String {
        format!("{}\n{}\n", title, "=".repeat(title.chars().count()))
    }

    fn format_report(&self, result: &LoadResult) -> Result<String> {
        let mut output = String::new();

        self.section(&mut output, "Summary", &summary_lines(result));
        self.section(&mut output, "Latency", &latency_lines(result));
        self.section(&mut output, "Throughput", &throughput_lines(result));

        let statuses = status_rows(result);
        if !statuses.is_empty() || self.options.verbose_mode {
            output.push_str("Status codes:\n");
            if statuses.is_empty() {
                output.push_str("  none\n");
            }
            for (code, count) in statuses {
                output.push_str(&format!("  {:<20} {}\n", code, count));
            }
            output.push('\n');
        }

        let errors = error_rows(result);
        if !errors.is_empty() || self.options.verbose_mode {
            output.push_str("Errors:\n");
            if errors.is_empty() {
                output.push_str("  none\n");
            }
            for (class, count) in errors {
                output.push_str(&format!("  {:<20} {}\n", class, count));
            }
            output.push('\n');
        }

        Ok(output.trim_end().to_string() + "\n")
    }

    fn format_stress_table(&self, steps: &[StressResult]) -> Result<String> {
        let rows: Vec<RowData> = steps.iter().map(stress_row).collect();
        let mut output = create_table(&stress_table_format(self.options.table_borders), &rows);
        output.push('\n');
        output.push_str(&stress_verdict(steps));
        output.push('\n');
        Ok(output)
    }

    fn format_violations(&self, violations: &[ThresholdViolation]) -> String {
        if violations.is_empty() {
            return self.format_success("All thresholds passed");
        }
        let mut output = String::from("Threshold violations:\n");
        for violation in violations {
            output.push_str(&format!("  - {}\n", violation));
        }
        output
    }

    fn format_error(&self, error: &str) -> String {
        format!("ERROR: {}", error)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("WARNING: {}", warning)
    }

    fn format_success(&self, message: &str) -> String {
        format!("OK: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorClass;
    use std::time::Duration;

    fn sample_result() -> LoadResult {
        let mut result = LoadResult {
            total_requests: 30,
            success_count: 20,
            failure_count: 10,
            elapsed: Duration::from_secs(2),
            requests_per_sec: 15.0,
            min_latency: Duration::from_millis(1),
            max_latency: Duration::from_millis(90),
            avg_latency: Duration::from_millis(12),
            p50: Duration::from_millis(10),
            p90: Duration::from_millis(30),
            p95: Duration::from_millis(50),
            p99: Duration::from_millis(80),
            bytes_sent: 0,
            bytes_received: 3072,
            ..LoadResult::default()
        };
        result.status_codes.insert(200, 20);
        result.status_codes.insert(500, 5);
        result.errors.insert(ErrorClass::ConnectionRefused, 5);
        result
    }

    fn plain() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..FormattingOptions::default()
        })
    }

    #[test]
    fn test_report_sections() {
        let report = plain().format_report(&sample_result()).unwrap();
        assert!(report.contains("Summary:"));
        assert!(report.contains("Total requests:"));
        assert!(report.contains("20 (66.67%)"));
        assert!(report.contains("Requests/sec:"));
        assert!(report.contains("15.00"));
        assert!(report.contains("p99:"));
        assert!(report.contains("80.00ms"));
        assert!(report.contains("3.00 KiB (1.50 KiB/s)"));
        assert!(report.contains("Status codes:"));
        assert!(report.contains("500"));
        assert!(report.contains("connection-refused"));
    }

    #[test]
    fn test_empty_histograms_hidden_unless_verbose() {
        let result = LoadResult::default();
        let report = plain().format_report(&result).unwrap();
        assert!(!report.contains("Errors:"));

        let verbose = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
            table_borders: true,
        });
        let report = verbose.format_report(&result).unwrap();
        assert!(report.contains("Errors:\n  none"));
    }

    #[test]
    fn test_stress_table() {
        let steps = vec![
            StressResult {
                concurrency: 10,
                result: LoadResult::default(),
                breaking_point: false,
            },
            StressResult {
                concurrency: 20,
                result: sample_result(),
                breaking_point: true,
            },
        ];
        let table = plain().format_stress_table(&steps).unwrap();
        assert!(table.contains("| Concurrency |"));
        assert!(table.contains("BREAKING POINT"));
        assert!(table.contains("Breaking point at concurrency 20 (33.33% failed)"));
    }

    #[test]
    fn test_stress_verdict_without_break() {
        let steps = vec![StressResult {
            concurrency: 5,
            result: LoadResult::default(),
            breaking_point: false,
        }];
        assert_eq!(stress_verdict(&steps), "No breaking point up to concurrency 5");
        assert_eq!(stress_verdict(&[]), "No stress steps were run");
    }

    #[test]
    fn test_table_alignment() {
        let format = TableFormat {
            columns: vec![Column::new("Name", Alignment::Left), Column::new("N", Alignment::Right)],
            show_borders: false,
        };
        let table = create_table(&format, &[vec!["a".to_string(), "100".to_string()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Name    N");
        assert_eq!(lines[1], "a     100");
    }

    #[test]
    fn test_scenarios_render_in_order() {
        let result = sample_result();
        let output = plain()
            .format_scenarios(&[("first", &result), ("second", &result)])
            .unwrap();
        let first = output.find("Scenario: first").unwrap();
        let second = output.find("Scenario: second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_violations() {
        let formatter = plain();
        assert_eq!(formatter.format_violations(&[]), "OK: All thresholds passed");
        let violation = ThresholdViolation {
            metric: "p99 latency",
            limit: "<= 10.00ms".to_string(),
            actual: "80.00ms".to_string(),
        };
        let output = formatter.format_violations(&[violation]);
        assert!(output.contains("p99 latency was 80.00ms (limit <= 10.00ms)"));
    }
}
