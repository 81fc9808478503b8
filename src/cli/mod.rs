//! Command-line interface definition

use crate::types::OutputFormat;
use crate::utils::duration::parse_duration_arg;
use clap::{ArgAction, Parser};
use reqwest::Method;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP Load Tester - fire concurrent HTTP requests at a target and report
/// latency percentiles, throughput and failures
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hlt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target URL
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// HTTP method
    #[arg(short = 'X', long, value_parser = parse_method)]
    pub method: Option<Method>,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", action = ArgAction::Append, value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request body
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the request body from a file
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Total number of requests to send
    #[arg(short = 'n', long)]
    pub requests: Option<u64>,

    /// How long to run (e.g. 500ms, 10s, 2m; bare numbers are seconds)
    #[arg(short = 'd', long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Maximum requests per second (0 disables the limit)
    #[arg(long)]
    pub rate: Option<u64>,

    /// Per-request timeout
    #[arg(short = 't', long, value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// Report redirect responses instead of following them
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Custom DNS servers (comma-separated)
    #[arg(long)]
    pub dns_servers: Option<String>,

    /// Unmeasured warmup run before the measured one
    #[arg(long, value_parser = parse_duration_arg)]
    pub warmup: Option<Duration>,

    /// Report format
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output (structured JSON logs on stderr)
    #[arg(long)]
    pub debug: bool,

    /// Fail when the 99th percentile latency exceeds this
    #[arg(long, value_parser = parse_duration_arg)]
    pub max_p99: Option<Duration>,

    /// Fail when throughput falls below this many requests per second
    #[arg(long)]
    pub min_rps: Option<f64>,

    /// Fail when the failure percentage exceeds this
    #[arg(long)]
    pub max_failure_rate: Option<f64>,

    /// Ramp concurrency step by step until the target breaks
    #[arg(long, conflicts_with = "scenario_file")]
    pub stress: bool,

    /// Concurrency of the first stress step
    #[arg(long, requires = "stress")]
    pub stress_start: Option<usize>,

    /// Concurrency added per stress step
    #[arg(long, requires = "stress")]
    pub stress_step: Option<usize>,

    /// Highest stress concurrency (inclusive)
    #[arg(long, requires = "stress")]
    pub stress_max: Option<usize>,

    /// Duration of each stress step
    #[arg(long, requires = "stress", value_parser = parse_duration_arg)]
    pub stress_step_duration: Option<Duration>,

    /// Failure percentage above which a stress step is the breaking point
    #[arg(long, requires = "stress")]
    pub failure_threshold: Option<f64>,

    /// Run the scenarios described in a JSON file
    #[arg(long, value_name = "PATH")]
    pub scenario_file: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.scenario_file.is_none() && self.url.is_none() && std::env::var("HLT_URL").is_err() {
            return Err("Must specify a target via --url (or HLT_URL) or use --scenario-file".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("--concurrency must be at least 1".to_string());
        }

        if let Some(rps) = self.min_rps {
            if rps < 0.0 {
                return Err("--min-rps cannot be negative".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse a `Name: value` header argument
pub fn parse_header(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once(':')
        .ok_or_else(|| format!("Invalid header '{}': expected 'Name: value'", input))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid header '{}': empty name", input));
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse an HTTP method, accepting any case
pub fn parse_method(input: &str) -> Result<Method, String> {
    Method::from_bytes(input.trim().to_uppercase().as_bytes())
        .map_err(|_| format!("Invalid HTTP method: {}", input))
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        use std::io::IsTerminal;
        std::io::stdout().is_terminal()
    }
    #[cfg(not(unix))]
    {
        false
    }
}
