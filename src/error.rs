//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for startup and the control
//! API. Each variant maps to a numeric code and an HTTP status and renders
//! a structured JSON body. [`ProtocolError`] and [`SendError`] cover the
//! per-message and per-client failures that never leave the core.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3002,
///     "message": "execute unavailable: client listener is not running",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category      | HTTP Status                 |
/// |-----------|---------------|-----------------------------|
/// | 1000–1999 | Validation    | 400 Bad Request             |
/// | 3000–3999 | Server        | 500 / 503                   |
/// | 429       | Cooldown      | 429 Too Many Requests       |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The client listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener attempted to bind.
        addr: SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Execute was requested after the client listener failed to start.
    #[error("execute unavailable: client listener is not running")]
    ExecuteUnavailable,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A previous execute is still cooling down.
    #[error("execute cooling down; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Milliseconds until the operator may retry.
        retry_after_ms: u64,
    },

    /// Outbound payload serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Listener I/O failure after startup.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidConfig(_) => 1002,
            Self::Bind { .. } => 3001,
            Self::ExecuteUnavailable => 3002,
            Self::Serialization(_) => 3003,
            Self::Io(_) => 3004,
            Self::RateLimited { .. } => 429,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Self::Bind { .. } | Self::ExecuteUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Serialization(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure to interpret an inbound text frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Not JSON, or the `op` envelope field is missing or not a string.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure to hand a frame to one client's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SendError {
    /// The connection's writer has stopped; the socket is gone.
    #[error("connection closed")]
    Closed,
    /// The connection's outbound queue is full.
    #[error("outbound queue full")]
    Backpressure,
}

impl SendError {
    /// Stable machine-readable name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Backpressure => "backpressure",
        }
    }
}

impl<T> From<TrySendError<T>> for SendError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => Self::Backpressure,
            TrySendError::Closed(_) => Self::Closed,
        }
    }
}
