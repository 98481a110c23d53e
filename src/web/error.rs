// Error types for the HTTP layer

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::BridgeError;

/// API server error types
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    RequestTimeout(String),
    UnsupportedMediaType(String),
    InternalServerError(String),

    // Application-specific errors
    ImageProcessingError(String),
    InvalidMask(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code_str) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            Self::RequestTimeout(msg) => (StatusCode::REQUEST_TIMEOUT, msg, "REQUEST_TIMEOUT"),
            Self::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                msg,
                "UNSUPPORTED_MEDIA_TYPE",
            ),
            Self::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            Self::ImageProcessingError(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Image processing error: {}", msg),
                "IMAGE_PROCESSING_ERROR",
            ),
            Self::InvalidMask(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid mask: {}", msg),
                "INVALID_MASK",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code_str,
                "status": status.as_u16(),
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::InvalidFilename(name) => {
                Self::BadRequest(format!("Invalid filename: {:?}", name))
            }
            BridgeError::FileNotFound(name) => Self::NotFound(format!("File not found: {}", name)),
            BridgeError::ReadTimeout { .. } => Self::RequestTimeout(error.to_string()),
            BridgeError::Decode(msg) | BridgeError::Encode(msg) => Self::ImageProcessingError(msg),
            BridgeError::InvalidMask(msg) => Self::InvalidMask(msg),
            BridgeError::Io(_)
            | BridgeError::Serialization(_)
            | BridgeError::SendFailed(_)
            | BridgeError::TaskFailed(_) => Self::InternalServerError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BridgeError::InvalidFilename("../x".into()), StatusCode::BAD_REQUEST),
            (BridgeError::FileNotFound("x".into()), StatusCode::NOT_FOUND),
            (BridgeError::Decode("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (BridgeError::InvalidMask("size".into()), StatusCode::BAD_REQUEST),
            (BridgeError::TaskFailed("panic".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }
}
