//! Error types for the synchronization client.
//!
//! [`ApiError`] covers every way a single API call can fail, split into
//! transport faults (network, timeout, HTTP status, undecodable body,
//! explicit cancellation) and protocol faults (a non-zero `code` with a
//! server-authored message). The long-poll "not changed" signal is not an
//! error and never appears here.

use std::time::Duration;

use clanraid_types::{ApiResponse, PayloadError, ServerCode};

/// Failure of a single API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The endpoint could not be reached or the connection broke.
    #[error("network error: {0}")]
    Network(String),

    /// No response arrived before the client-side deadline.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Http(u16),

    /// The response body was not a valid envelope or payload.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// The call was cancelled on purpose by the client.
    ///
    /// [`HttpTransport`](crate::HttpTransport) never produces this; the poll
    /// loop learns about cancellation through its token. The variant exists
    /// for custom transports that abort calls themselves.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-zero code. The message is shown
    /// to the user verbatim.
    #[error("{message}")]
    Server {
        /// Status code from the envelope.
        code: ServerCode,
        /// Server-authored message.
        message: String,
    },
}

impl From<PayloadError> for ApiError {
    fn from(error: PayloadError) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Turn any non-zero envelope into [`ApiError::Server`].
///
/// The long-poll loop does not use this: it needs to see `code == 1`.
pub fn into_success(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    match response.server_code() {
        ServerCode::Ok => Ok(response),
        code => Err(ApiError::Server {
            code,
            message: response
                .message
                .unwrap_or_else(|| format!("server returned code {code}")),
        }),
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// A required setting is absent.
    #[error("missing required setting {0}")]
    Missing(String),

    /// A setting is present but unusable.
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Errors that end or refuse a session operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration was rejected.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A bootstrap call failed.
    #[error("bootstrap call failed: {source}")]
    Api {
        /// The underlying API error.
        #[from]
        source: ApiError,
    },

    /// A bootstrap response lacked an expected field.
    #[error("bootstrap payload error: {source}")]
    Payload {
        /// The underlying payload error.
        #[from]
        source: PayloadError,
    },

    /// The session already started its one long-poll loop.
    #[error("the long-poll loop was already started for this session")]
    AlreadyPolling,
}
