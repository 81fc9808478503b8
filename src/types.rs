//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Semantic bucket for a request that failed below the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// The per-request timeout elapsed
    Timeout,
    /// The target actively refused the TCP connection
    ConnectionRefused,
    /// The host name could not be resolved
    DnsError,
    /// Anything else, including requests that could not be built
    Other,
}

impl ErrorClass {
    /// All classes in report order
    pub const ALL: [ErrorClass; 4] = [
        ErrorClass::Timeout,
        ErrorClass::ConnectionRefused,
        ErrorClass::DnsError,
        ErrorClass::Other,
    ];

    /// Stable key used in reports and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Timeout => "timeout",
            ErrorClass::ConnectionRefused => "connection-refused",
            ErrorClass::DnsError => "dns-error",
            ErrorClass::Other => "other",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A response arrived with this status code
    Status(u16),
    /// No response arrived
    Failed(ErrorClass),
}

impl RequestOutcome {
    /// Success iff a response arrived with a status in [200, 400)
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Status(code) if (200..400).contains(code))
    }
}

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text report
    #[default]
    Text,
    /// Machine-readable JSON document
    Json,
}
