//! Domain Services
//!
//! Pure logic shared by the use cases: the entitlement rule, promo pricing
//! and media token signing.

use chrono::{DateTime, Utc};
use platform::crypto::{sha256_concat, to_hex};

use crate::domain::entity::{course::Course, learner::Learner, promo_code::PromoCode};
use crate::domain::value_object::{
    access::{AccessDecision, AccessReason},
    money::Money,
};

/// The entitlement rule: admins see everything, everyone else sees what they
/// own.
pub fn decide_access(learner: &Learner, course: &Course) -> AccessDecision {
    let reason = if learner.is_admin() {
        AccessReason::AdminAccess
    } else if learner.owns(&course.course_id) {
        AccessReason::Purchased
    } else {
        AccessReason::NotPurchased
    };

    AccessDecision {
        has_access: reason.grants_access(),
        reason,
        course_title: Some(course.title.clone()),
        course_price: Some(course.price),
        user_role: Some(learner.role),
    }
}

/// Resolved price for one learner and one course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub original: Money,
    pub final_price: Money,
    /// Percent applied, when a promo code was honored
    pub discount_percent: Option<u8>,
}

impl PriceQuote {
    pub fn discount_amount(&self) -> Money {
        self.original.saturating_sub(self.final_price)
    }
}

/// Price `course` for `learner`, honoring `promo` only when it applies.
/// An inapplicable promo falls back to full price.
pub fn quote_price(
    course: &Course,
    learner: &Learner,
    promo: Option<&PromoCode>,
    now: DateTime<Utc>,
) -> PriceQuote {
    let applicable = promo.filter(|p| {
        p.check_applicable(&course.course_id, &learner.user_id, now)
            .is_ok()
    });

    match applicable {
        Some(promo) => PriceQuote {
            original: course.price,
            final_price: course.price.apply_discount(promo.discount_percent),
            discount_percent: Some(promo.discount_percent),
        },
        None => PriceQuote {
            original: course.price,
            final_price: course.price,
            discount_percent: None,
        },
    }
}

/// CDN token: `hex(sha256(secret || media_id || expires))`. The CDN
/// recomputes it from the same inputs to validate playback.
pub fn sign_media_token(secret: &str, media_id: &str, expires_epoch_secs: i64) -> String {
    let expires = expires_epoch_secs.to_string();
    to_hex(&sha256_concat(&[
        secret.as_bytes(),
        media_id.as_bytes(),
        expires.as_bytes(),
    ]))
}
