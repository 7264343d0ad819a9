//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::Error;

/// API errors, rendered as `{"error": {"code", "message"}}`
#[derive(Debug)]
pub enum ApiError {
    NotConfigured(&'static str),
    BadRequest(String),
    TranscodeFailed(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidUserId(id) => Self::BadRequest(format!("invalid user id: {id:?}")),
            Error::Transcode(msg) => Self::TranscodeFailed(msg),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::TranscodeFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "transcode_failed", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let status = |e: Error| ApiError::from(e).into_response().status();

        assert_eq!(status(Error::InvalidUserId("..".to_string())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::Transcode("ffmpeg exited".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NotConfigured("voice disabled").into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
