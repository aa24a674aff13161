//! Access Decision
//!
//! Result of an entitlement check. Callers render it as-is (paywall, lesson
//! page) or turn it into an error for gated endpoints.

use serde::Serialize;

use crate::domain::value_object::{
    learner_role::LearnerRole, localized_text::LocalizedText, money::Money,
};
use crate::error::AcademyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    NotAuthenticated,
    UserNotFound,
    /// Also used for malformed ids and lessons missing from the course
    CourseNotFound,
    AdminAccess,
    Purchased,
    NotPurchased,
    CheckFailed,
}

impl AccessReason {
    pub const fn code(&self) -> &'static str {
        match self {
            AccessReason::NotAuthenticated => "not_authenticated",
            AccessReason::UserNotFound => "user_not_found",
            AccessReason::CourseNotFound => "course_not_found",
            AccessReason::AdminAccess => "admin_access",
            AccessReason::Purchased => "purchased",
            AccessReason::NotPurchased => "not_purchased",
            AccessReason::CheckFailed => "check_failed",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            AccessReason::NotAuthenticated => "Sign in to access this course",
            AccessReason::UserNotFound => "User account not found",
            AccessReason::CourseNotFound => "Course not found",
            AccessReason::AdminAccess => "Administrator access",
            AccessReason::Purchased => "Course purchased",
            AccessReason::NotPurchased => "Purchase this course to access its lessons",
            AccessReason::CheckFailed => "Unable to verify access, please try again",
        }
    }

    pub const fn grants_access(&self) -> bool {
        matches!(self, AccessReason::AdminAccess | AccessReason::Purchased)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    pub has_access: bool,
    pub reason: AccessReason,
    pub course_title: Option<LocalizedText>,
    pub course_price: Option<Money>,
    pub user_role: Option<LearnerRole>,
}

impl AccessDecision {
    /// A decision with no course or user context attached
    pub fn denied(reason: AccessReason) -> Self {
        Self {
            has_access: false,
            reason,
            course_title: None,
            course_price: None,
            user_role: None,
        }
    }

    pub fn check_failed() -> Self {
        Self::denied(AccessReason::CheckFailed)
    }

    pub fn message(&self) -> &'static str {
        self.reason.message()
    }

    /// Map a denial onto the error a gated endpoint should answer with
    pub fn to_error(&self) -> AcademyError {
        match self.reason {
            AccessReason::NotAuthenticated | AccessReason::UserNotFound => {
                AcademyError::NotAuthenticated
            }
            AccessReason::CourseNotFound => AcademyError::CourseNotFound,
            AccessReason::NotPurchased => AcademyError::AccessDenied,
            AccessReason::CheckFailed => AcademyError::AccessCheckFailed,
            AccessReason::AdminAccess | AccessReason::Purchased => {
                AcademyError::Internal("granted decision converted to error".into())
            }
        }
    }
}
