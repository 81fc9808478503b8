//! Environment variable handling and .env file management

use super::AppConfig;
use crate::cli::{parse_header, parse_method};
use crate::dns::parse_dns_servers;
use crate::error::{AppError, Result};
use crate::utils::parse_duration;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    ///
    /// Variables already set in the process environment take precedence over
    /// the file.
    pub fn load_env_file(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# HTTP Load Tester Configuration
#
# Values set here are defaults; command-line flags override them.

# Target URL
# HLT_URL=http://localhost:8080/health

# HTTP method
# HLT_METHOD=GET

# Number of concurrent workers
# HLT_CONCURRENCY=10

# Total number of requests (0 = no request count bound)
# HLT_REQUESTS=1000

# Run duration (e.g. 500ms, 30s, 2m)
# HLT_DURATION=30s

# Maximum requests per second (0 = unthrottled)
# HLT_RATE=0

# Per-request timeout
# HLT_TIMEOUT=30s

# Headers separated by ';' (e.g. "Accept: application/json;X-Token: abc")
# HLT_HEADERS=Accept: application/json

# Custom DNS servers (comma-separated)
# HLT_DNS_SERVERS=8.8.8.8,1.1.1.1

# Enable colored output (true/false)
# HLT_ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let mut probe = AppConfig::default();
        apply_var(&mut probe, key, value)
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("HLT_URL", "Target URL", "http://localhost:8080/"),
            ("HLT_METHOD", "HTTP method", "POST"),
            ("HLT_CONCURRENCY", "Number of concurrent workers", "10"),
            ("HLT_REQUESTS", "Total number of requests", "1000"),
            ("HLT_DURATION", "Run duration", "30s"),
            ("HLT_RATE", "Maximum requests per second", "100"),
            ("HLT_TIMEOUT", "Per-request timeout", "5s"),
            ("HLT_HEADERS", "Headers separated by ';'", "Accept: application/json;X-Token: abc"),
            ("HLT_DNS_SERVERS", "Custom DNS servers (comma-separated)", "8.8.8.8,1.1.1.1"),
            ("HLT_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }
}

impl AppConfig {
    /// Merge `HLT_*` variables from the process environment
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Merge variables from an arbitrary lookup
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, _, _) in EnvManager::get_supported_env_vars() {
            if let Some(value) = lookup(key) {
                apply_var(self, key, &value)?;
            }
        }
        Ok(())
    }
}

fn apply_var(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
    let invalid = |e: String| AppError::config(format!("Invalid {} value '{}': {}", key, value, e));
    let value = value.trim();

    match key {
        "HLT_URL" => {
            url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
            config.load.url = value.to_string();
        }
        "HLT_METHOD" => config.load.method = parse_method(value).map_err(invalid)?,
        "HLT_CONCURRENCY" => {
            let concurrency: usize = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
            if concurrency == 0 {
                return Err(invalid("must be at least 1".to_string()));
            }
            config.load.concurrency = concurrency;
        }
        "HLT_REQUESTS" => {
            config.load.requests = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?
        }
        "HLT_DURATION" => config.load.duration = parse_duration(value).map_err(|e| invalid(e.to_string()))?,
        "HLT_RATE" => {
            config.load.rate_limit = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?
        }
        "HLT_TIMEOUT" => {
            let timeout = parse_duration(value).map_err(|e| invalid(e.to_string()))?;
            if timeout.is_zero() {
                return Err(invalid("must be greater than zero".to_string()));
            }
            config.load.timeout = timeout;
        }
        "HLT_HEADERS" => {
            config.load.headers = value
                .split(';')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(parse_header)
                .collect::<std::result::Result<_, _>>()
                .map_err(invalid)?;
        }
        "HLT_ENABLE_COLOR" => {
            config.enable_color = value.parse().map_err(|e: std::str::ParseBoolError| invalid(e.to_string()))?
        }
        "HLT_DNS_SERVERS" => config.load.dns_servers = parse_dns_servers(value)?,
        _ => {}
    }

    Ok(())
}
