//! Error types for the IBGE client.

use mcpbr_core::CnaeError;

/// Result type for client operations.
pub type IbgeResult<T> = Result<T, IbgeError>;

/// Error types that can occur when talking to the IBGE API.
#[derive(Debug, thiserror::Error)]
pub enum IbgeError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Connection timeout.
    #[error("Request timed out")]
    Timeout,

    /// Body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Body was JSON but not shaped like a CNAE record.
    #[error("Unexpected payload: {0}")]
    Payload(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl IbgeError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Create an API error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            "empty body".to_string()
        } else {
            body.chars().take(200).collect()
        };
        Self::Api { status, message }
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }
}

impl From<IbgeError> for CnaeError {
    fn from(err: IbgeError) -> Self {
        match err {
            IbgeError::Json(_) | IbgeError::Payload(_) => CnaeError::UpstreamMalformed(err.to_string()),
            IbgeError::Http(ref e) if e.is_decode() => CnaeError::UpstreamMalformed(err.to_string()),
            // 4xx other than not-found means our request no longer fits the API
            IbgeError::Api { status, .. } if (400..500).contains(&status) && status != 429 => {
                CnaeError::UpstreamMalformed(err.to_string())
            }
            _ => CnaeError::UpstreamUnavailable(err.to_string()),
        }
    }
}
