use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{any::Any, time::Duration};
use thiserror::Error;
use tracing::error;

use crate::fallback::RATE_LIMITED_MESSAGE;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    BadRequest(String),

    #[error("Too many requests")]
    RateLimited { retry_after: Duration },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::BadRequest(msg) => {
                (status, Json(json!({ "error": format!("Malformed payload: {msg}") }))).into_response()
            }
            AppError::RateLimited { retry_after } => {
                let mut resp = (
                    status,
                    Json(json!({
                        "error": "Too many requests",
                        "fallback": true,
                        "message": RATE_LIMITED_MESSAGE,
                    })),
                )
                    .into_response();
                let secs = retry_after.as_secs().max(1);
                if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                    resp.headers_mut().insert(RETRY_AFTER, v);
                }
                resp
            }
            AppError::Internal(e) => {
                error!("internal error: {e:#}");
                (
                    status,
                    Json(json!({
                        "success": false,
                        "error": "Internal error",
                        "message": crate::fallback::INVALID_REQUEST_MESSAGE,
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Response for a handler that panicked, installed with tower-http's
/// `CatchPanicLayer` so the client still gets a JSON 500.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        let limited = AppError::RateLimited {
            retry_after: Duration::from_secs(12),
        }
        .into_response();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers()[RETRY_AFTER], "12");
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_panic_payloads_become_500() {
        let payloads: [Box<dyn Any + Send>; 3] = [
            Box::new("boom"),
            Box::new(String::from("boom")),
            Box::new(42_u8),
        ];
        for payload in payloads {
            assert_eq!(
                panic_response(payload).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
