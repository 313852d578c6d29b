//! Error types for the Gemini proxy
//!
//! Every error is scoped to a single request and rendered as a plain-text
//! response. CORS headers are added by the router layer, so error responses
//! carry them like any other response.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Request-level errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidJson(String),

    #[error("Unsupported media type. Use 'application/json' content type")]
    UnsupportedMediaType,

    #[error("API key required. Pass it as the 'key' query parameter or as an 'Authorization: Bearer' header")]
    MissingApiKey,

    #[error("Not found")]
    NotFound,

    #[error("Gemini API responded:\n\n{body}")]
    Upstream { status: StatusCode, body: String },

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// Wrap a transport failure, stripping the request URL so the key never leaks
    pub fn transport(err: reqwest::Error) -> Self {
        ProxyError::Transport(err.without_url())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ProxyError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ProxyError::MissingApiKey => StatusCode::UNAUTHORIZED,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Transport(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::transport(err)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Result type alias for convenience
pub type ProxyResult<T> = Result<T, ProxyError>;
