//! Request/response transport to the clan battle API endpoint.
//!
//! [`Transport`] is the seam between the sync client and the network. The
//! production implementation, [`HttpTransport`], POSTs each request as JSON
//! to the group's endpoint with `reqwest`; tests substitute scripted
//! implementations. Transports never interpret the `code` field: they
//! return any well-formed envelope and leave classification to callers.

use std::future::Future;
use std::time::Duration;

use clanraid_types::{ApiRequest, ApiResponse};

use crate::config::SyncConfig;
use crate::error::ApiError;

/// Sends one request and resolves to its decoded envelope.
///
/// Uses return-position `impl Future` so implementations can be plain
/// `async fn`; callers stay generic over the transport instead of boxing.
pub trait Transport: Send + Sync + 'static {
    /// Perform one call.
    ///
    /// `deadline` overrides the transport's default per-request timeout.
    /// The long-poll loop passes its hard timeout here.
    ///
    /// # Errors
    ///
    /// Returns a transport-class [`ApiError`] when no envelope could be
    /// obtained. A non-zero `code` is not an error at this layer.
    fn call(
        &self,
        request: &ApiRequest,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// `reqwest`-backed transport for a single group endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    cookie: Option<String>,
    default_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built
    /// (for example when the TLS backend fails to initialize).
    pub fn new(config: &SyncConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            cookie: config.session_cookie.clone(),
            default_timeout: config.request_timeout(),
        })
    }

    /// The URL every request is sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn call(
        &self,
        request: &ApiRequest,
        deadline: Option<Duration>,
    ) -> Result<ApiResponse, ApiError> {
        let timeout = deadline.unwrap_or(self.default_timeout);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(request);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                action = request.action(),
                status = status.as_u16(),
                "endpoint returned non-success status"
            );
            return Err(ApiError::Http(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&e, timeout))?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(timeout)
    } else if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}
