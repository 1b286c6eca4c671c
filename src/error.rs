//! Error types for the gateway.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::translate::openai_types::ChatErrorResponse;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    /// Non-success answer from the upstream service. The body is relayed untouched.
    #[error("Upstream returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("{message}")]
    MediaFetch { message: String },

    #[error("{message}")]
    MalformedDataUrl { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: msg.into(),
        }
    }

    pub fn media_fetch(msg: impl Into<String>) -> Self {
        Self::MediaFetch {
            message: msg.into(),
        }
    }

    pub fn malformed_data_url(msg: impl Into<String>) -> Self {
        Self::MalformedDataUrl {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status reported to the caller for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Upstream { body, .. } => {
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            other => (status, Json(ChatErrorResponse::new(other.to_string()))).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
