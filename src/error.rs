//! Crate-wide error type and its HTTP mapping.
//!
//! The taxonomy follows the failure policy of the service: timeouts and
//! browser failures surface as 500 with a terse message, downstream
//! timeouts as 504, client-invalid input as 400. Upstream non-2xx bodies
//! are relayed with their original status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum Error {
    /// A browser navigation, response capture or downstream call exceeded
    /// its per-call deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx answer from a third-party source; status and body are
    /// relayed to direct-fetch callers.
    #[error("upstream returned {status}")]
    Upstream { status: u16, body: String },

    /// Malformed JSON/HTML or missing required fields in an upstream
    /// payload.
    #[error("failed to parse upstream payload: {0}")]
    Parse(String),

    /// Browser launch or CDP-level failure.
    #[error("browser session failed: {0}")]
    Browser(String),

    /// Client-invalid input (unparseable parameters and the like).
    #[error("{0}")]
    BadRequest(String),

    /// Invalid environment configuration; fatal at startup.
    #[error(transparent)]
    Config(#[from] crate::settings::SettingsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Outcome observed through the single-flight coordinator: the waiter
    /// shares the leader's failure.
    #[error("{0}")]
    Shared(Arc<Error>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Unwrap single-flight sharing so status mapping sees the root cause.
    fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self.root() {
            Error::Timeout(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Error::Upstream { status, body } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                body.clone(),
            ),
            Error::Http(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, "downstream timed out".to_string())
            }
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        warn!(%status, error = %self, "request failed");
        (status, body).into_response()
    }
}
