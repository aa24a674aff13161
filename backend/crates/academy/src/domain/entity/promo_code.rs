//! Promo Code Entity

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, PromoCodeId, UserId};

use crate::error::{AcademyError, AcademyResult};

const CODE_MAX_LENGTH: usize = 64;

/// Why a promo code cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    NotFound,
    Inactive,
    Expired,
    WrongCourse,
    Exhausted,
    AlreadyUsed,
}

impl PromoRejection {
    pub const fn code(&self) -> &'static str {
        match self {
            PromoRejection::NotFound => "not_found",
            PromoRejection::Inactive => "inactive",
            PromoRejection::Expired => "expired",
            PromoRejection::WrongCourse => "wrong_course",
            PromoRejection::Exhausted => "exhausted",
            PromoRejection::AlreadyUsed => "already_used",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoCode {
    pub promo_code_id: PromoCodeId,
    /// Trimmed and upper-cased
    pub code: String,
    pub discount_percent: u8,
    pub expires_at: DateTime<Utc>,
    /// `None` applies to every course
    pub course_id: Option<CourseId>,
    pub used_count: i32,
    pub max_uses: Option<i32>,
    pub used_by: HashSet<UserId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin input for a new promo code
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_percent: i32,
    pub expires_at: DateTime<Utc>,
    pub course_id: Option<CourseId>,
    pub max_uses: Option<i32>,
}

impl PromoCode {
    /// Canonical form used for storage and lookup
    pub fn normalize_code(raw: &str) -> AcademyResult<String> {
        let code = raw.trim().to_uppercase();

        if code.is_empty() {
            return Err(AcademyError::ValidationFailed("promo code is required".into()));
        }
        if code.chars().count() > CODE_MAX_LENGTH {
            return Err(AcademyError::ValidationFailed(format!(
                "promo code must be at most {CODE_MAX_LENGTH} characters"
            )));
        }
        if !code
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AcademyError::ValidationFailed(
                "promo code may only contain letters, digits, '-' and '_'".into(),
            ));
        }

        Ok(code)
    }

    pub fn create(input: NewPromoCode, now: DateTime<Utc>) -> AcademyResult<Self> {
        let code = Self::normalize_code(&input.code)?;

        let discount_percent = u8::try_from(input.discount_percent)
            .ok()
            .filter(|p| (1..=100).contains(p))
            .ok_or_else(|| {
                AcademyError::ValidationFailed("discountPercent must be between 1 and 100".into())
            })?;

        if input.expires_at <= now {
            return Err(AcademyError::ValidationFailed(
                "expiresAt must be in the future".into(),
            ));
        }

        if input.max_uses.is_some_and(|max| max < 1) {
            return Err(AcademyError::ValidationFailed(
                "maxUses must be at least 1".into(),
            ));
        }

        Ok(Self {
            promo_code_id: PromoCodeId::new(),
            code,
            discount_percent,
            expires_at: input.expires_at,
            course_id: input.course_id,
            used_count: 0,
            max_uses: input.max_uses,
            used_by: HashSet::new(),
            active: true,
            created_at: now,
        })
    }

    /// Whether `user_id` may apply this code to `course_id` at `now`
    pub fn check_applicable(
        &self,
        course_id: &CourseId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(), PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if self.expires_at <= now {
            return Err(PromoRejection::Expired);
        }
        if self.course_id.is_some_and(|restricted| &restricted != course_id) {
            return Err(PromoRejection::WrongCourse);
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return Err(PromoRejection::Exhausted);
        }
        if self.used_by.contains(user_id) {
            return Err(PromoRejection::AlreadyUsed);
        }
        Ok(())
    }
}
