//! Error-to-HTTP response conversion.
//!
//! Wraps [`mt_core::Error`] so route handlers can return
//! `Result<T, AppError>` and have failures rendered as
//! `{"error": ..., "code": ..., "request_id": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: mt_core::Error,
    request_id: Option<String>,
    /// Overrides the status derived from the error, e.g. 413 for an oversized
    /// upload.
    status: Option<StatusCode>,
}

impl AppError {
    pub fn new(inner: mt_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
            status: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| {
            StatusCode::from_u16(self.inner.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}

impl From<mt_core::Error> for AppError {
    fn from(e: mt_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "request rejected");
        }

        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            self.inner.code()
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
