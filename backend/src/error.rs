//! Application error handling
//!
//! This module provides unified error handling for the API,
//! converting internal errors to `{"message": ...}` HTTP responses.
//! Infrastructure failures are logged with their cause and answered with a
//! generic message; the cause never reaches the client.

use account_auth_shared::MessageResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate registration. Reported as 400, like every other client error
    /// on the register endpoint.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    /// An internal error whose client-facing message names the failed
    /// operation, e.g. "Registration failed".
    #[error("{message}")]
    OperationFailed {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    /// Replace the client-facing message of an internal error with an
    /// operation-level one. Client errors pass through untouched.
    pub fn masked(self, message: &'static str) -> Self {
        match self {
            ApiError::Internal(source) => ApiError::OperationFailed { message, source },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::OperationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg) => msg,
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                "An internal error occurred".to_string()
            }
            ApiError::OperationFailed { message, source } => {
                error!("{}: {:?}", message, source);
                message.to_string()
            }
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn body_message(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: MessageResponse = serde_json::from_slice(&bytes).unwrap();
        body.message
    }

    #[rstest]
    #[case(ApiError::Validation("Invalid input".to_string()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::BadRequest("Malformed".to_string()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::Conflict("User already exists".to_string()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::Unauthorized("Invalid token".to_string()), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::NotFound("User not found".to_string()), StatusCode::NOT_FOUND)]
    #[case(ApiError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_error_status(#[case] error: ApiError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[tokio::test]
    async fn test_client_error_message_is_returned() {
        let response = ApiError::Unauthorized("Invalid credentials".to_string()).into_response();
        assert_eq!(body_message(response).await, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_internal_cause_is_hidden() {
        let response = ApiError::Internal(anyhow::anyhow!("connection refused")).into_response();
        let message = body_message(response).await;
        assert!(!message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_masked_internal_error() {
        let error = ApiError::Internal(anyhow::anyhow!("pool timed out")).masked("Login failed");
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_message(response).await, "Login failed");
    }

    #[test]
    fn test_masked_leaves_client_errors_alone() {
        let error = ApiError::Conflict("User already exists".to_string()).masked("Registration failed");
        assert!(matches!(error, ApiError::Conflict(msg) if msg == "User already exists"));
    }
}
