//! Payment gateway port
//!
//! Checkout sessions go out through [`PaymentGateway`]; confirmations come
//! back as signed webhook deliveries that the gateway verifies and decodes
//! into a typed [`PaymentEvent`].

use std::collections::HashMap;

use kernel::id::{CourseId, PromoCodeId, UserId};

use crate::domain::value_object::{localized_text::Locale, money::Money};
use crate::error::{AcademyError, AcademyResult};

pub const METADATA_COURSE_ID: &str = "courseId";
pub const METADATA_USER_ID: &str = "userId";
pub const METADATA_PROMO_CODE_ID: &str = "promoCodeId";

/// Opaque metadata attached to a checkout session and echoed back in events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub promo_code_id: Option<PromoCodeId>,
}

impl CheckoutMetadata {
    pub fn to_map(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            (METADATA_COURSE_ID, self.course_id.to_string()),
            (METADATA_USER_ID, self.user_id.to_string()),
        ];
        if let Some(promo) = self.promo_code_id {
            entries.push((METADATA_PROMO_CODE_ID, promo.to_string()));
        }
        entries
    }

    /// Validate raw metadata. Missing or malformed ids are a permanent
    /// `ValidationFailed`.
    pub fn from_map(raw: &HashMap<String, String>) -> AcademyResult<Self> {
        let required = |key: &str| -> AcademyResult<&str> {
            raw.get(key)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AcademyError::ValidationFailed(format!("metadata.{key} is missing")))
        };

        let course_id = CourseId::parse(required(METADATA_COURSE_ID)?).ok_or_else(|| {
            AcademyError::ValidationFailed("metadata.courseId is malformed".into())
        })?;
        let user_id = UserId::parse(required(METADATA_USER_ID)?)
            .ok_or_else(|| AcademyError::ValidationFailed("metadata.userId is malformed".into()))?;

        let promo_code_id = match raw
            .get(METADATA_PROMO_CODE_ID)
            .filter(|v| !v.trim().is_empty())
        {
            Some(value) => Some(PromoCodeId::parse(value).ok_or_else(|| {
                AcademyError::ValidationFailed("metadata.promoCodeId is malformed".into())
            })?),
            None => None,
        };

        Ok(Self {
            course_id,
            user_id,
            promo_code_id,
        })
    }
}

/// Everything the gateway needs to open a hosted checkout page
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub amount: Money,
    pub currency: String,
    pub customer_email: String,
    pub locale: Locale,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    pub event_id: String,
    pub session_id: String,
    pub amount_total: Money,
    pub currency: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedCheckout {
    pub event_id: String,
    /// Checkout session id, or payment intent id for intent failures
    pub reference: String,
    /// Best effort: failure events with unusable metadata are still
    /// acknowledged
    pub metadata: Option<CheckoutMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    CheckoutCompleted(CompletedCheckout),
    CheckoutExpired(FailedCheckout),
    PaymentFailed(FailedCheckout),
    Ignored { event_type: String },
}

#[trait_variant::make(PaymentGateway: Send)]
pub trait LocalPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> AcademyResult<CheckoutSession>;

    /// Verify the signature over the raw body, then decode the event.
    /// Nothing in the payload is read before the signature checks out.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> AcademyResult<PaymentEvent>;
}
