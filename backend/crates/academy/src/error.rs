//! Academy Error Types
//!
//! Academy-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Academy-specific result type alias
pub type AcademyResult<T> = Result<T, AcademyError>;

#[derive(Debug, Error)]
pub enum AcademyError {
    /// No identity on the request
    #[error("Authentication required")]
    NotAuthenticated,

    /// Identity present but not entitled
    #[error("Access denied")]
    AccessDenied,

    /// Entitlement could not be evaluated; access fails closed
    #[error("Access check failed")]
    AccessCheckFailed,

    #[error("Course not found")]
    CourseNotFound,

    #[error("Lesson not found")]
    LessonNotFound,

    #[error("Media not found")]
    MediaNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Course already owned")]
    AlreadyOwned,

    #[error("Promo code already exists")]
    PromoCodeTaken,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Webhook signature missing, malformed, stale or wrong
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    #[error("Timed out: {0}")]
    Timeout(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AcademyError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcademyError::NotAuthenticated => ErrorKind::Unauthorized,
            AcademyError::AccessDenied => ErrorKind::Forbidden,
            AcademyError::CourseNotFound
            | AcademyError::LessonNotFound
            | AcademyError::MediaNotFound
            | AcademyError::FileNotFound
            | AcademyError::UserNotFound => ErrorKind::NotFound,
            AcademyError::AlreadyOwned | AcademyError::PromoCodeTaken => ErrorKind::Conflict,
            AcademyError::ValidationFailed(_) | AcademyError::InvalidSignature(_) => {
                ErrorKind::BadRequest
            }
            AcademyError::PaymentGateway(_) | AcademyError::BlobStorage(_) => ErrorKind::BadGateway,
            AcademyError::AccessCheckFailed | AcademyError::Timeout(_) => {
                ErrorKind::ServiceUnavailable
            }
            AcademyError::Database(_) | AcademyError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Machine-readable reason code carried in the problem body
    pub fn code(&self) -> &'static str {
        match self {
            AcademyError::NotAuthenticated => "not_authenticated",
            AcademyError::AccessDenied => "not_purchased",
            AcademyError::AccessCheckFailed => "check_failed",
            AcademyError::CourseNotFound => "course_not_found",
            AcademyError::LessonNotFound => "lesson_not_found",
            AcademyError::MediaNotFound => "media_not_found",
            AcademyError::FileNotFound => "file_not_found",
            AcademyError::UserNotFound => "user_not_found",
            AcademyError::AlreadyOwned => "already_owned",
            AcademyError::PromoCodeTaken => "promo_code_taken",
            AcademyError::ValidationFailed(_) => "validation_failed",
            AcademyError::InvalidSignature(_) => "invalid_signature",
            AcademyError::PaymentGateway(_) => "payment_gateway_failed",
            AcademyError::BlobStorage(_) => "blob_storage_failed",
            AcademyError::Timeout(_) => "timeout",
            AcademyError::Database(_) | AcademyError::Internal(_) => "internal",
        }
    }

    /// Whether a retry could succeed.
    ///
    /// The payment webhook answers transient errors with 5xx so the provider
    /// re-delivers, and acknowledges permanent ones.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AcademyError::AccessCheckFailed
                | AcademyError::PaymentGateway(_)
                | AcademyError::BlobStorage(_)
                | AcademyError::Timeout(_)
                | AcademyError::Database(_)
                | AcademyError::Internal(_)
        )
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            AcademyError::Database(_) | AcademyError::Internal(_) => {
                "Internal server error".to_string()
            }
            AcademyError::PaymentGateway(_) => "Payment provider unavailable".to_string(),
            AcademyError::BlobStorage(_) => "File storage unavailable".to_string(),
            other => other.to_string(),
        };

        let err = AppError::new(self.kind(), message).with_code(self.code());
        match self {
            AcademyError::NotAuthenticated => err.with_action("Sign in to continue"),
            AcademyError::AccessDenied => err.with_action("Purchase the course to unlock it"),
            _ => err,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            AcademyError::Database(e) => {
                tracing::error!(error = %e, "Academy database error");
            }
            AcademyError::Internal(msg) => {
                tracing::error!(message = %msg, "Academy internal error");
            }
            AcademyError::PaymentGateway(msg) => {
                tracing::error!(message = %msg, "Payment gateway failure");
            }
            AcademyError::BlobStorage(msg) => {
                tracing::error!(message = %msg, "Blob storage failure");
            }
            AcademyError::AccessCheckFailed | AcademyError::Timeout(_) => {
                tracing::warn!(error = %self, "Academy request could not complete");
            }
            AcademyError::InvalidSignature(reason) => {
                tracing::warn!(reason = %reason, "Rejected webhook signature");
            }
            AcademyError::AccessDenied => {
                tracing::warn!("Access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Academy error");
            }
        }
    }
}

impl IntoResponse for AcademyError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AcademyError {
    fn from(err: AppError) -> Self {
        AcademyError::ValidationFailed(err.message().to_string())
    }
}
