use crate::store::StoreError;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;
use thiserror::Error;

/// Field name -> human message, reported alongside validation failures.
pub type FieldErrors = HashMap<String, String>;

/// Application error taxonomy. Every failure a handler can produce maps onto
/// exactly one of these, and each variant owns its HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },
    #[error("{0}")]
    CredentialCreation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn validation(errors: FieldErrors) -> Self {
        Self::Validation {
            message: "Invalid request payload".to_string(),
            errors,
        }
    }

    /// Request body failed to parse as JSON at all.
    pub fn invalid_body(err: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: format!("Invalid request body: {}", err),
            errors: FieldErrors::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::CredentialCreation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authentication(_) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "ValidationError",
            ApiError::CredentialCreation(_) => "CredentialCreationFailed",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Authentication(_) => "AuthenticationFailed",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Upstream(_) => "InternalError",
        }
    }

    /// Render as a JSON error response. Upstream detail is logged here and
    /// never leaves the process.
    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let body = match &self {
            ApiError::Validation { message, errors } => serde_json::json!({
                "error": self.code(),
                "message": message,
                "errors": errors,
            }),
            ApiError::Upstream(detail) => {
                tracing::error!("Upstream failure: {}", detail);
                serde_json::json!({
                    "error": self.code(),
                    "message": "Internal server error",
                })
            }
            other => serde_json::json!({
                "error": other.code(),
                "message": other.to_string(),
            }),
        };

        Ok(Response::builder()
            .status(self.status())
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(body.to_string().into())
            .map_err(Box::new)?)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
