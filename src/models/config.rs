//! Load test configuration data model

use crate::defaults;
use crate::types::{AppError, Result};
use bytes::Bytes;
use reqwest::{Client, Method, Request};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Builds each request of a run dynamically
///
/// `sequence` is the zero-based dispatch number of the request, which lets a
/// factory vary payloads or paths per request. Errors are recorded as failed
/// requests and never abort the run.
pub trait RequestFactory: Send + Sync {
    fn build(&self, client: &Client, sequence: u64) -> Result<Request>;
}

impl<F> RequestFactory for F
where
    F: Fn(&Client, u64) -> Result<Request> + Send + Sync,
{
    fn build(&self, client: &Client, sequence: u64) -> Result<Request> {
        self(client, sequence)
    }
}

/// Description of one load-test run against a single target
#[derive(Clone)]
pub struct LoadConfig {
    /// Target URL
    pub url: String,

    /// HTTP method
    pub method: Method,

    /// Headers applied to every request, in order
    pub headers: Vec<(String, String)>,

    /// Request body sent with every request
    pub body: Option<Bytes>,

    /// Number of concurrent workers (0 means the default)
    pub concurrency: usize,

    /// Total number of requests to dispatch (0 means unbounded)
    pub requests: u64,

    /// Wall-clock run duration (zero means unbounded)
    pub duration: Duration,

    /// Maximum dispatch rate in requests per second (0 means unthrottled)
    pub rate_limit: u64,

    /// Per-request timeout (zero means the default)
    pub timeout: Duration,

    /// Follow HTTP redirects (status is taken from the final response)
    pub follow_redirects: bool,

    /// Resolve host names through these servers instead of the system resolver
    pub dns_servers: Vec<IpAddr>,

    /// Optional builder for dynamic requests; replaces method/url/body
    pub request_factory: Option<Arc<dyn RequestFactory>>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            concurrency: defaults::DEFAULT_CONCURRENCY,
            requests: 0,
            duration: Duration::ZERO,
            rate_limit: 0,
            timeout: defaults::DEFAULT_TIMEOUT,
            follow_redirects: true,
            dns_servers: Vec::new(),
            request_factory: None,
        }
    }
}

impl fmt::Debug for LoadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(|b| b.len()))
            .field("concurrency", &self.concurrency)
            .field("requests", &self.requests)
            .field("duration", &self.duration)
            .field("rate_limit", &self.rate_limit)
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("dns_servers", &self.dns_servers)
            .field("request_factory", &self.request_factory.is_some())
            .finish()
    }
}

impl LoadConfig {
    /// Create a configuration for `url` with default settings
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_requests(mut self, requests: u64) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_dns_servers(mut self, servers: Vec<IpAddr>) -> Self {
        self.dns_servers = servers;
        self
    }

    pub fn with_request_factory<F: RequestFactory + 'static>(mut self, factory: F) -> Self {
        self.request_factory = Some(Arc::new(factory));
        self
    }

    /// Worker count with the zero default applied
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            defaults::DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        }
    }

    /// Per-request timeout with the zero default applied
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            defaults::DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// True when neither a request count nor a duration bounds the run
    pub fn is_unbounded(&self) -> bool {
        self.requests == 0 && self.duration.is_zero()
    }

    /// Interval between dispatches when rate limited
    pub fn rate_interval(&self) -> Option<Duration> {
        if self.rate_limit == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.rate_limit as f64))
        }
    }

    /// Check the fields a run cannot start without
    ///
    /// An unbounded configuration is accepted here; such a run lasts until
    /// the caller cancels it.
    pub fn validate(&self) -> Result<()> {
        if self.request_factory.is_none() {
            if self.url.is_empty() {
                return Err(AppError::config("Target URL cannot be empty"));
            }

            let parsed = url::Url::parse(&self.url)
                .map_err(|e| AppError::config(format!("Invalid target URL '{}': {}", self.url, e)))?;

            match parsed.scheme() {
                "http" | "https" => {}
                scheme => {
                    return Err(AppError::config(format!(
                        "Unsupported URL scheme '{}' (expected http or https)",
                        scheme
                    )))
                }
            }

            if parsed.host().is_none() {
                return Err(AppError::config(format!("Target URL '{}' has no host", self.url)));
            }
        }

        for (name, _) in &self.headers {
            if name.trim().is_empty() {
                return Err(AppError::config("Header name cannot be empty"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoadConfig::new("http://localhost:8080");
        assert_eq!(config.method, Method::GET);
        assert_eq!(config.concurrency, defaults::DEFAULT_CONCURRENCY);
        assert_eq!(config.requests, 0);
        assert!(config.duration.is_zero());
        assert_eq!(config.rate_limit, 0);
        assert_eq!(config.timeout, defaults::DEFAULT_TIMEOUT);
        assert!(config.follow_redirects);
        assert!(config.is_unbounded());
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let config = LoadConfig::new("http://localhost")
            .with_concurrency(0)
            .with_timeout(Duration::ZERO);
        assert_eq!(config.effective_concurrency(), defaults::DEFAULT_CONCURRENCY);
        assert_eq!(config.effective_timeout(), defaults::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_rate_interval() {
        let config = LoadConfig::new("http://localhost");
        assert_eq!(config.rate_interval(), None);

        let config = config.with_rate_limit(20);
        assert_eq!(config.rate_interval(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_validate_urls() {
        assert!(LoadConfig::new("http://localhost:1/x").validate().is_ok());
        assert!(LoadConfig::new("https://example.com").validate().is_ok());
        assert!(LoadConfig::new("").validate().is_err());
        assert!(LoadConfig::new("not a url").validate().is_err());
        assert!(LoadConfig::new("ftp://example.com").validate().is_err());
    }

    #[test]
    fn test_validate_skips_url_with_factory() {
        let config = LoadConfig::default().with_request_factory(|client: &Client, _seq: u64| {
            client
                .get("http://localhost/")
                .build()
                .map_err(AppError::from)
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_header_name() {
        let config = LoadConfig::new("http://localhost").with_header(" ", "x");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_body() {
        let config = LoadConfig::new("http://localhost").with_body("secret-payload");
        let debug = format!("{:?}", config);
        assert!(debug.contains("body_len: Some(14)"));
        assert!(!debug.contains("secret-payload"));
    }
}
