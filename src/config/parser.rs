//! Configuration parsing from CLI arguments and environment variables

use super::AppConfig;
use crate::assertions::Thresholds;
use crate::cli::Cli;
use crate::dns::parse_dns_servers;
use crate::error::{ErrorContext, Result};
use crate::executor::stress::StressSpec;
use crate::utils::format_duration;
use bytes::Bytes;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    ///
    /// The `.env` file is expected to be loaded into the process
    /// environment already.
    pub fn parse(&self) -> Result<AppConfig> {
        let mut config = AppConfig::default();
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut AppConfig) -> Result<()> {
        let cli = &self.cli;
        let load = &mut config.load;

        if let Some(url) = &cli.url {
            load.url = url.clone();
        }
        if let Some(method) = &cli.method {
            load.method = method.clone();
        }
        if !cli.headers.is_empty() {
            load.headers = cli.headers.clone();
        }

        if let Some(body) = &cli.body {
            load.body = Some(Bytes::from(body.clone()));
        } else if let Some(path) = &cli.body_file {
            let content = std::fs::read(path)
                .with_context(|| format!("Failed to read body file {}", path.display()))?;
            load.body = Some(Bytes::from(content));
        }

        if let Some(concurrency) = cli.concurrency {
            load.concurrency = concurrency;
        }
        if let Some(requests) = cli.requests {
            load.requests = requests;
        }
        if let Some(duration) = cli.duration {
            load.duration = duration;
        }
        if let Some(rate) = cli.rate {
            load.rate_limit = rate;
        }
        if let Some(timeout) = cli.timeout {
            load.timeout = timeout;
        }
        if cli.no_follow_redirects {
            load.follow_redirects = false;
        }
        if let Some(servers) = &cli.dns_servers {
            load.dns_servers = parse_dns_servers(servers)?;
        }

        config.warmup = cli.warmup.or(config.warmup);

        let thresholds = Thresholds {
            max_p99: cli.max_p99,
            min_rps: cli.min_rps,
            max_failure_rate: cli.max_failure_rate,
        };
        if !thresholds.is_empty() {
            config.thresholds = thresholds;
        }

        if cli.stress {
            let defaults = StressSpec::default();
            config.stress = Some(StressSpec {
                start: cli.stress_start.unwrap_or(defaults.start),
                step: cli.stress_step.unwrap_or(defaults.step),
                max: cli.stress_max.unwrap_or(defaults.max),
                step_duration: cli.stress_step_duration.unwrap_or(defaults.step_duration),
                failure_threshold: cli.failure_threshold.unwrap_or(defaults.failure_threshold),
            });
        }

        if let Some(path) = &cli.scenario_file {
            config.scenario_file = Some(path.clone());
        }
        if let Some(format) = cli.output {
            config.output_format = format;
        }
        if cli.color {
            config.enable_color = true;
        } else if cli.no_color {
            config.enable_color = false;
        } else if config.enable_color {
            config.enable_color = cli.use_colors();
        }

        config.verbose = cli.verbose;
        config.debug = cli.debug;

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<AppConfig> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &AppConfig) -> String {
    let load = &config.load;
    let mut summary = Vec::new();

    summary.push(format!("Target: {} {}", load.method, load.url));
    summary.push(format!("Concurrency: {}", load.effective_concurrency()));
    summary.push(format!(
        "Requests: {}",
        if load.requests == 0 { "unbounded".to_string() } else { load.requests.to_string() }
    ));
    summary.push(format!(
        "Duration: {}",
        if load.duration.is_zero() { "unbounded".to_string() } else { format_duration(load.duration) }
    ));
    summary.push(format!(
        "Rate limit: {}",
        if load.rate_limit == 0 { "none".to_string() } else { format!("{} req/s", load.rate_limit) }
    ));
    summary.push(format!("Timeout: {}", format_duration(load.effective_timeout())));
    summary.push(format!("Follow redirects: {}", load.follow_redirects));
    if !load.dns_servers.is_empty() {
        let servers: Vec<String> = load.dns_servers.iter().map(|ip| ip.to_string()).collect();
        summary.push(format!("DNS servers: {}", servers.join(", ")));
    }
    if let Some(warmup) = config.warmup {
        summary.push(format!("Warmup: {}", format_duration(warmup)));
    }
    summary.push(format!("Color Output: {}", config.enable_color));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::types::OutputFormat;
    use clap::Parser;
    use reqwest::Method;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn overrides(args: &[&str]) -> Result<AppConfig> {
        let cli = Cli::parse_from(args);
        let mut config = AppConfig::default();
        ConfigParser::new(cli).apply_cli_overrides(&mut config)?;
        Ok(config)
    }

    #[test]
    fn test_cli_overrides() {
        let config = overrides(&[
            "hlt", "--url", "http://localhost:8080/", "-X", "put", "-c", "8", "-n", "200", "--rate", "30",
            "-t", "2s", "--no-follow-redirects", "--no-color", "--verbose", "-o", "json",
        ])
        .unwrap();

        assert_eq!(config.load.url, "http://localhost:8080/");
        assert_eq!(config.load.method, Method::PUT);
        assert_eq!(config.load.concurrency, 8);
        assert_eq!(config.load.requests, 200);
        assert_eq!(config.load.rate_limit, 30);
        assert_eq!(config.load.timeout, Duration::from_secs(2));
        assert!(!config.load.follow_redirects);
        assert!(!config.enable_color);
        assert!(config.verbose);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_env_values() {
        let mut config = AppConfig::default();
        config
            .merge_env_with(|key| match key {
                "HLT_CONCURRENCY" => Some("3".to_string()),
                "HLT_URL" => Some("http://env.example/".to_string()),
                _ => None,
            })
            .unwrap();

        let cli = Cli::parse_from(["hlt", "-c", "12"]);
        ConfigParser::new(cli).apply_cli_overrides(&mut config).unwrap();

        assert_eq!(config.load.concurrency, 12);
        assert_eq!(config.load.url, "http://env.example/");
    }

    #[test]
    fn test_body_file_is_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"hello\":\"world\"}").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = overrides(&["hlt", "--url", "http://x/", "--body-file", &path]).unwrap();
        assert_eq!(config.load.body.as_deref(), Some(&b"{\"hello\":\"world\"}"[..]));
    }

    #[test]
    fn test_missing_body_file_is_io_error() {
        let err = overrides(&["hlt", "--url", "http://x/", "--body-file", "/nonexistent/body.json"]).unwrap_err();
        assert_eq!(err.category(), "IO");
        assert!(err.to_string().contains("Failed to read body file /nonexistent/body.json"));
    }

    #[test]
    fn test_stress_flags_build_spec() {
        let config = overrides(&[
            "hlt", "--url", "http://x/", "--stress", "--stress-start", "2", "--stress-step", "3",
            "--stress-max", "11", "--failure-threshold", "1.5",
        ])
        .unwrap();

        let spec = config.stress.clone().unwrap();
        assert_eq!((spec.start, spec.step, spec.max), (2, 3, 11));
        assert_eq!(spec.failure_threshold, 1.5);
        assert_eq!(spec.step_duration, StressSpec::default().step_duration);
        assert!(matches!(config.mode(), RunMode::Stress(_)));
    }

    #[test]
    fn test_threshold_flags() {
        let config = overrides(&["hlt", "--url", "http://x/", "--max-p99", "300ms", "--max-failure-rate", "1"]).unwrap();
        assert_eq!(config.thresholds.max_p99, Some(Duration::from_millis(300)));
        assert_eq!(config.thresholds.max_failure_rate, Some(1.0));
        assert_eq!(config.thresholds.min_rps, None);
    }

    #[test]
    fn test_dns_servers_flag() {
        let config = overrides(&["hlt", "--url", "http://x/", "--dns-servers", "1.1.1.1,8.8.8.8"]).unwrap();
        assert_eq!(config.load.dns_servers.len(), 2);
        assert!(overrides(&["hlt", "--url", "http://x/", "--dns-servers", "nope"]).is_err());
    }

    #[test]
    fn test_config_summary() {
        let config = overrides(&["hlt", "--url", "http://x/", "-d", "5s", "--warmup", "1s"]).unwrap();
        let summary = display_config_summary(&config);
        assert!(summary.contains("Target: GET http://x/"));
        assert!(summary.contains("Requests: unbounded"));
        assert!(summary.contains("Duration: 5.00s"));
        assert!(summary.contains("Warmup: 1.00s"));
    }
}
