/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// Two mappings carry policy weight:
/// - `AuthzError::NotFound` maps to 404 even when the resource exists;
///   non-members must not learn of its existence.
/// - Database errors map to an opaque 500; constraint names and driver
///   messages never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use corkboard_shared::auth::authorization::AuthzError;
use corkboard_shared::auth::password::PasswordError;
use corkboard_shared::auth::token::TokenError;
use corkboard_shared::models::membership::MembershipError;
use corkboard_shared::models::public_access_token::PublicTokenError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - duplicate membership or public token
    Conflict(String),

    /// Bad request (400) with field details - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Converts `validator` derive output into the 400 detail list
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
///
/// Everything is internal: constraint violations that matter to clients
/// are mapped to typed errors before they reach this impl.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert token errors to API errors
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            TokenError::InvalidToken(_) => ApiError::Unauthorized("Invalid token".to_string()),
            TokenError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            // Existence hiding: sent as 404, indistinguishable from a
            // missing resource
            AuthzError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            AuthzError::NotEnoughRights => {
                ApiError::Forbidden("Not enough rights".to_string())
            }
            AuthzError::Database(err) => {
                ApiError::InternalError(format!("Database error: {}", err))
            }
        }
    }
}

/// Convert membership errors to API errors
impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::AlreadyMember => {
                ApiError::Conflict("User is already a member".to_string())
            }
            MembershipError::Database(err) => {
                ApiError::InternalError(format!("Database error: {}", err))
            }
        }
    }
}

/// Convert public-token errors to API errors
impl From<PublicTokenError> for ApiError {
    fn from(err: PublicTokenError) -> Self {
        match err {
            PublicTokenError::TokenNotFound => {
                ApiError::NotFound("Public token not found".to_string())
            }
            PublicTokenError::TokenInactive => {
                ApiError::Forbidden("Public token is inactive".to_string())
            }
            PublicTokenError::TokenExpired => {
                ApiError::Forbidden("Public token has expired".to_string())
            }
            PublicTokenError::TokenAlreadyExists => {
                ApiError::Conflict("A public token already exists for this resource".to_string())
            }
            PublicTokenError::TaskNotFound => ApiError::NotFound("Task not found".to_string()),
            PublicTokenError::Database(err) => {
                ApiError::InternalError(format!("Database error: {}", err))
            }
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Board not found".to_string());
        assert_eq!(err.to_string(), "Not found: Board not found");
    }

    #[test]
    fn test_authz_not_found_is_404() {
        let err: ApiError = AuthzError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = AuthzError::NotEnoughRights.into();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_duplicate_membership_is_conflict() {
        let err: ApiError = MembershipError::AlreadyMember.into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_public_token_states() {
        assert!(matches!(
            ApiError::from(PublicTokenError::TokenNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(PublicTokenError::TokenInactive),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(PublicTokenError::TokenExpired),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(PublicTokenError::TokenAlreadyExists),
            ApiError::Conflict(_)
        ));
    }
}
