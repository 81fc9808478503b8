//! Single request construction, execution and failure classification

use crate::dns::{self, LoadResolver};
use crate::error::{AppError, Result};
use crate::models::{LoadConfig, RequestFactory, ResultRecorder};
use crate::types::{ErrorClass, RequestOutcome};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Method, Request};
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Redirect hops followed before a response is taken as final
const MAX_REDIRECTS: usize = 10;

/// Build the HTTP client shared by every worker of a run
pub fn build_client(config: &LoadConfig) -> Result<Client> {
    let resolver = LoadResolver::new(&config.dns_servers)?;
    let redirect_policy = if config.follow_redirects {
        redirect::Policy::limited(MAX_REDIRECTS)
    } else {
        redirect::Policy::none()
    };

    Client::builder()
        .pool_max_idle_per_host(config.effective_concurrency())
        .timeout(config.effective_timeout())
        .redirect(redirect_policy)
        .dns_resolver(Arc::new(resolver))
        .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
        .build()
        .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))
}

/// Pre-parsed parts of the request every worker sends
#[derive(Clone)]
pub struct RequestTemplate {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Duration,
    factory: Option<Arc<dyn RequestFactory>>,
}

impl RequestTemplate {
    /// Parse URL and headers once so a bad configuration fails the run up front
    pub fn from_config(config: &LoadConfig) -> Result<Self> {
        let url = match &config.request_factory {
            Some(_) => None,
            None => Some(
                Url::parse(&config.url)
                    .map_err(|e| AppError::config(format!("Invalid target URL '{}': {}", config.url, e)))?,
            ),
        };

        let mut headers = HeaderMap::with_capacity(config.headers.len());
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|e| AppError::config(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value.trim())
                .map_err(|e| AppError::config(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.append(header_name, header_value);
        }

        Ok(Self {
            method: config.method.clone(),
            url,
            headers,
            body: config.body.clone(),
            timeout: config.effective_timeout(),
            factory: config.request_factory.clone(),
        })
    }

    /// Build the request for dispatch number `sequence`
    ///
    /// Configured headers are added to factory-built requests too, and the
    /// per-request timeout applies unless the factory set its own.
    pub fn build(&self, client: &Client, sequence: u64) -> Result<Request> {
        let mut request = match (&self.factory, &self.url) {
            (Some(factory), _) => factory.build(client, sequence)?,
            (None, Some(url)) => {
                let mut request = Request::new(self.method.clone(), url.clone());
                if let Some(body) = &self.body {
                    *request.body_mut() = Some(body.clone().into());
                }
                request
            }
            (None, None) => return Err(AppError::config("No target URL or request factory configured")),
        };

        for (name, value) in &self.headers {
            request.headers_mut().append(name.clone(), value.clone());
        }
        if request.timeout().is_none() {
            *request.timeout_mut() = Some(self.timeout);
        }

        Ok(request)
    }
}

/// Everything a worker needs to fire and record one request
pub struct RequestExecutor {
    client: Client,
    template: RequestTemplate,
    recorder: Arc<ResultRecorder>,
    stop: CancellationToken,
    caller: CancellationToken,
}

impl RequestExecutor {
    pub fn new(client: Client, template: RequestTemplate, recorder: Arc<ResultRecorder>) -> Self {
        Self {
            client,
            template,
            recorder,
            stop: CancellationToken::new(),
            caller: CancellationToken::new(),
        }
    }

    /// Abort in-flight requests once `stop` fires
    ///
    /// `caller` tells a deadline stop apart from an external cancellation
    /// when the aborted request is classified.
    pub fn with_stop(mut self, stop: CancellationToken, caller: CancellationToken) -> Self {
        self.stop = stop;
        self.caller = caller;
        self
    }

    /// True once the run has stopped dispatching
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Execute one request and record its outcome; never fails the run
    ///
    /// A request still in flight when the run stops is cut short and
    /// recorded as a failure: `timeout` when the run's duration elapsed,
    /// `other` when the caller cancelled.
    pub async fn execute(&self, sequence: u64) {
        let start = Instant::now();

        let request = match self.template.build(&self.client, sequence) {
            Ok(request) => request,
            Err(_) => {
                self.recorder
                    .record(RequestOutcome::Failed(ErrorClass::Other), start.elapsed(), 0, 0);
                return;
            }
        };

        let bytes_sent = request
            .body()
            .and_then(|body| body.as_bytes())
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0);

        let (outcome, bytes_received) = tokio::select! {
            biased;
            finished = self.send(request) => finished,
            _ = self.stop.cancelled() => (RequestOutcome::Failed(self.abort_class()), 0),
        };

        self.recorder
            .record(outcome, start.elapsed(), bytes_sent, bytes_received);
    }

    async fn send(&self, request: Request) -> (RequestOutcome, u64) {
        let mut response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(error) => return (RequestOutcome::Failed(classify_error(&error)), 0),
        };

        let status = response.status().as_u16();
        let mut received = 0u64;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => received += chunk.len() as u64,
                Ok(None) => return (RequestOutcome::Status(status), received),
                // The status alone is not a success if the body never arrives.
                Err(error) => return (RequestOutcome::Failed(classify_error(&error)), received),
            }
        }
    }

    fn abort_class(&self) -> ErrorClass {
        if self.caller.is_cancelled() {
            ErrorClass::Other
        } else {
            ErrorClass::Timeout
        }
    }
}

/// Map a transport error onto its error class by walking the source chain
pub fn classify_error(error: &reqwest::Error) -> ErrorClass {
    if error.is_timeout() {
        return ErrorClass::Timeout;
    }
    if dns::is_resolve_error(error) {
        return ErrorClass::DnsError;
    }

    let mut current: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            match io_error.kind() {
                io::ErrorKind::ConnectionRefused => return ErrorClass::ConnectionRefused,
                io::ErrorKind::TimedOut => return ErrorClass::Timeout,
                _ => {}
            }
        }
        current = err.source();
    }

    ErrorClass::Other
}
