//! Identity Error Types
//!
//! Identity-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Session cookie missing, tampered with, or expired
    #[error("Session not found or expired")]
    SessionInvalid,

    /// OAuth `state` did not match the one we issued
    #[error("OAuth state mismatch")]
    OAuthStateMismatch,

    /// The provider refused the code or returned garbage
    #[error("OAuth provider error: {0}")]
    OAuthProvider(String),

    /// Provider profile lacks a verified email
    #[error("Email address is not verified by the provider")]
    EmailNotVerified,

    /// Provider profile failed validation
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::SessionInvalid => ErrorKind::Unauthorized,
            IdentityError::OAuthStateMismatch | IdentityError::InvalidProfile(_) => {
                ErrorKind::BadRequest
            }
            IdentityError::EmailNotVerified => ErrorKind::Forbidden,
            IdentityError::UserNotFound => ErrorKind::NotFound,
            IdentityError::OAuthProvider(_) => ErrorKind::BadGateway,
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            IdentityError::SessionInvalid => "not_authenticated",
            IdentityError::OAuthStateMismatch => "oauth_state_mismatch",
            IdentityError::OAuthProvider(_) => "oauth_provider_failed",
            IdentityError::EmailNotVerified => "email_not_verified",
            IdentityError::InvalidProfile(_) => "invalid_profile",
            IdentityError::UserNotFound => "user_not_found",
            IdentityError::Database(_) | IdentityError::Internal(_) => "internal",
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            // Don't leak driver details to clients
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        AppError::new(self.kind(), message).with_code(self.code())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::OAuthProvider(msg) => {
                tracing::error!(message = %msg, "OAuth provider failure");
            }
            IdentityError::OAuthStateMismatch => {
                tracing::warn!("OAuth callback with mismatched state");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        IdentityError::InvalidProfile(err.message().to_string())
    }
}
