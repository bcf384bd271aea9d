//! API error handling and response envelope

use crate::auth::AuthError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_core::{GatehouseError, PageMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            code: code.into(),
            message: message.into(),
            details: None,
            errors: None,
        }
    }
}

/// Success envelope shared by the user endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data: None,
            meta: None,
        }
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Validation(validator::ValidationErrors),
    Unauthorized(String),
    Conflict(String),
    Internal(String),
    Database(String),
}

fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{resource} not found")),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ),
            AppError::Validation(errors) => {
                let mut error = ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "The given data was invalid.",
                );
                error.errors = Some(field_messages(&errors));
                (StatusCode::BAD_REQUEST, error)
            }
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", msg),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error",
                    ),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                let mut error = ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database operation failed",
                );
                if cfg!(debug_assertions) {
                    error.details = Some(msg);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, error)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

// Extractor failures keep the JSON envelope instead of axum's plain text
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<GatehouseError> for AppError {
    fn from(err: GatehouseError) -> Self {
        match err {
            GatehouseError::NotFound(resource) => AppError::NotFound(resource),
            GatehouseError::Validation(msg) => AppError::BadRequest(msg),
            GatehouseError::Conflict(msg) => AppError::Conflict(msg),
            GatehouseError::Database(msg) => AppError::Database(msg),
            GatehouseError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            GatehouseError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized(format!("authentication failed: {err}"))
            }
            AuthError::Internal(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct PasswordForm {
        #[validate(length(min = 8, message = "password must be at least 8 characters"))]
        password: String,
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::NotFound("User".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_core_error_conversion() {
        assert!(matches!(
            AppError::from(GatehouseError::Conflict("dup".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(GatehouseError::NotFound("User".into())),
            AppError::NotFound(r) if r == "User"
        ));
    }

    #[test]
    fn test_invalid_credentials_message() {
        match AppError::from(AuthError::InvalidCredentials) {
            AppError::Unauthorized(msg) => assert_eq!(
                msg,
                "authentication failed: credentials does not matches our record"
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validation_field_messages() {
        let errors = PasswordForm {
            password: "short".into(),
        }
        .validate()
        .unwrap_err();

        let messages = field_messages(&errors);
        assert_eq!(
            messages.get("password").unwrap(),
            &vec!["password must be at least 8 characters".to_string()]
        );
    }
}
