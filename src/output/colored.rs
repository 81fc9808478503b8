//! Colored formatter implementation with terminal color support

use super::formatter::{
    create_table, error_rows, label_width, latency_lines, status_rows, stress_row, stress_table_format,
    stress_verdict, summary_lines, throughput_lines, FormattingOptions, Line, OutputFormatter, RowData,
};
use crate::assertions::ThresholdViolation;
use crate::error::Result;
use crate::executor::stress::StressResult;
use crate::models::LoadResult;
use colored::*;
use std::time::Duration;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceLevel {
    Excellent, // < 50ms
    Good,      // 50-100ms
    Fair,      // 100-300ms
    Poor,      // 300-1000ms
    VeryPoor,  // > 1000ms
}

impl PerformanceLevel {
    /// Classify a latency value
    pub fn from_latency(latency: Duration) -> Self {
        let ms = latency.as_secs_f64() * 1000.0;
        if ms < 50.0 {
            Self::Excellent
        } else if ms < 100.0 {
            Self::Good
        } else if ms < 300.0 {
            Self::Fair
        } else if ms < 1000.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub label: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::BrightBlue,
            label: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter with ANSI color support
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Replace the default color scheme
    pub fn with_color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = color_scheme;
        self
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.options.enable_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.options.enable_color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Color for a failure percentage
    fn rate_color(&self, failure_rate: f64) -> Color {
        if failure_rate == 0.0 {
            self.color_scheme.success
        } else if failure_rate < 5.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        }
    }

    fn section(&self, output: &mut String, title: &str, lines: &[Line], paint: impl Fn(&str, &str) -> String) {
        let width = label_width(lines);
        output.push_str(&self.bold(&self.colorize(&format!("{}:", title), self.color_scheme.header)));
        output.push('\n');
        for (label, value) in lines {
            let label = format!("{:<width$}", format!("{}:", label), width = width);
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize(&label, self.color_scheme.label),
                paint(&label, value)
            ));
        }
        output.push('\n');
    }

    fn histogram<K: std::fmt::Display>(&self, output: &mut String, title: &str, rows: &[(K, u64)], color: Color) {
        output.push_str(&self.bold(&self.colorize(&format!("{}:", title), self.color_scheme.header)));
        output.push('\n');
        if rows.is_empty() {
            output.push_str(&format!("  {}\n", self.colorize("none", self.color_scheme.muted)));
        }
        for (key, count) in rows {
            let key = format!("{:<20}", key.to_string());
            output.push_str(&format!("  {} {}\n", self.colorize(&key, color), count));
        }
        output.push('\n');
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> String {
        let rule = "=".repeat(title.chars().count());
        format!(
            "{}\n{}\n",
            self.bold(&self.colorize(title, self.color_scheme.header)),
            self.colorize(&rule, self.color_scheme.muted)
        )
    }

    fn format_report(&self, result: &LoadResult) -> Result<String> {
        let mut output = String::new();

        let failure_color = self.rate_color(result.failure_rate());
        self.section(&mut output, "Summary", &summary_lines(result), |label, value| {
            match label.trim_end() {
                "Successful:" if result.success_count > 0 => self.colorize(value, self.color_scheme.success),
                "Failed:" => self.colorize(value, failure_color),
                _ => value.to_string(),
            }
        });

        let latencies = [
            result.min_latency,
            result.avg_latency,
            result.p50,
            result.p90,
            result.p95,
            result.p99,
            result.max_latency,
        ];
        let latency = latency_lines(result);
        self.section(&mut output, "Latency", &latency, |label, value| {
            latency
                .iter()
                .position(|(name, _)| label.trim_end().trim_end_matches(':') == *name)
                .and_then(|idx| latencies.get(idx))
                .map(|d| self.colorize(value, PerformanceLevel::from_latency(*d).color()))
                .unwrap_or_else(|| value.to_string())
        });

        self.section(&mut output, "Throughput", &throughput_lines(result), |_, value| value.to_string());

        let statuses = status_rows(result);
        if !statuses.is_empty() || self.options.verbose_mode {
            let (ok, bad): (Vec<_>, Vec<_>) = statuses.into_iter().partition(|(code, _)| *code < 400);
            let mut rows: Vec<(String, u64)> = Vec::new();
            for (code, count) in ok {
                rows.push((self.colorize(&format!("{:<20}", code), self.color_scheme.success), count));
            }
            for (code, count) in bad {
                rows.push((self.colorize(&format!("{:<20}", code), self.color_scheme.error), count));
            }
            output.push_str(&self.bold(&self.colorize("Status codes:", self.color_scheme.header)));
            output.push('\n');
            if rows.is_empty() {
                output.push_str(&format!("  {}\n", self.colorize("none", self.color_scheme.muted)));
            }
            for (code, count) in rows {
                output.push_str(&format!("  {} {}\n", code, count));
            }
            output.push('\n');
        }

        let errors = error_rows(result);
        if !errors.is_empty() || self.options.verbose_mode {
            self.histogram(&mut output, "Errors", &errors, self.color_scheme.error);
        }

        Ok(output.trim_end().to_string() + "\n")
    }

    fn format_stress_table(&self, steps: &[StressResult]) -> Result<String> {
        let rows: Vec<RowData> = steps.iter().map(stress_row).collect();
        let table = create_table(&stress_table_format(self.options.table_borders), &rows);

        // Colour after layout so escape codes do not skew column widths.
        let mut output = String::new();
        for line in table.lines() {
            if line.contains("BREAKING POINT") {
                output.push_str(&self.colorize(line, self.color_scheme.error));
            } else if line.starts_with('+') {
                output.push_str(&self.colorize(line, self.color_scheme.muted));
            } else {
                output.push_str(line);
            }
            output.push('\n');
        }
        output.push('\n');

        let verdict = stress_verdict(steps);
        let color = if steps.iter().any(|s| s.breaking_point) {
            self.color_scheme.error
        } else {
            self.color_scheme.success
        };
        output.push_str(&self.bold(&self.colorize(&verdict, color)));
        output.push('\n');
        Ok(output)
    }

    fn format_violations(&self, violations: &[ThresholdViolation]) -> String {
        if violations.is_empty() {
            return self.format_success("All thresholds passed");
        }
        let mut output = self.bold(&self.colorize("Threshold violations:", self.color_scheme.error));
        output.push('\n');
        for violation in violations {
            output.push_str(&format!("  {} {}\n", self.colorize("✗", self.color_scheme.error), violation));
        }
        output
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", self.bold(&self.colorize("ERROR:", self.color_scheme.error)), error)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("{} {}", self.bold(&self.colorize("WARNING:", self.color_scheme.warning)), warning)
    }

    fn format_success(&self, message: &str) -> String {
        format!("{} {}", self.colorize("✓", self.color_scheme.success), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> ColoredFormatter {
        // Color disabled keeps assertions independent of the terminal.
        ColoredFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
            table_borders: true,
        })
        .with_color_scheme(ColorScheme::default())
    }

    #[test]
    fn test_performance_levels() {
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(10)), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(75)), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(200)), PerformanceLevel::Fair);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_millis(500)), PerformanceLevel::Poor);
        assert_eq!(PerformanceLevel::from_latency(Duration::from_secs(2)), PerformanceLevel::VeryPoor);
    }

    #[test]
    fn test_report_contains_sections() {
        let mut result = LoadResult {
            total_requests: 4,
            success_count: 3,
            failure_count: 1,
            p99: Duration::from_millis(120),
            ..LoadResult::default()
        };
        result.status_codes.insert(200, 3);
        result.status_codes.insert(503, 1);

        let report = formatter().format_report(&result).unwrap();
        assert!(report.contains("Summary:"));
        assert!(report.contains("3 (75.00%)"));
        assert!(report.contains("120.00ms"));
        assert!(report.contains("503"));
        assert!(report.contains("Errors:\n  none"));
    }

    #[test]
    fn test_stress_table_marks_break() {
        let steps = vec![StressResult {
            concurrency: 40,
            result: LoadResult::default(),
            breaking_point: true,
        }];
        let output = formatter().format_stress_table(&steps).unwrap();
        assert!(output.contains("BREAKING POINT"));
        assert!(output.contains("Breaking point at concurrency 40"));
    }

    #[test]
    fn test_messages() {
        let formatter = formatter();
        assert_eq!(formatter.format_error("boom"), "ERROR: boom");
        assert_eq!(formatter.format_warning("careful"), "WARNING: careful");
        assert!(formatter.format_success("done").ends_with("done"));
    }
}
