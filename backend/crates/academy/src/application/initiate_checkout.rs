//! Initiate Checkout Use Case
//!
//! Prices the course for the caller and opens a hosted checkout session at
//! the payment gateway.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{CourseId, PromoCodeId};
use kernel::identity::RequestIdentity;

use crate::application::config::AcademyConfig;
use crate::domain::entity::order::{Order, OrderDraft};
use crate::domain::entity::promo_code::PromoCode;
use crate::domain::payment::{CheckoutMetadata, CheckoutRequest, PaymentGateway};
use crate::domain::repository::{
    CourseRepository, LearnerRepository, OrderRepository, PromoCodeRepository,
};
use crate::domain::services::quote_price;
use crate::domain::value_object::{localized_text::Locale, money::Money};
use crate::error::{AcademyError, AcademyResult};

pub struct CheckoutInput {
    pub course_id: String,
    pub promo_code_id: Option<String>,
    pub locale: Locale,
}

#[derive(Debug)]
pub struct CheckoutOutput {
    /// Hosted payment page
    pub url: String,
    pub session_id: String,
    pub amount: Money,
    pub currency: String,
    pub discount_percent: Option<u8>,
}

pub struct InitiateCheckoutUseCase<L, C, P, O, G>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: PromoCodeRepository,
    O: OrderRepository,
    G: PaymentGateway,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
    promo_repo: Arc<P>,
    order_repo: Arc<O>,
    gateway: Arc<G>,
    config: Arc<AcademyConfig>,
}

impl<L, C, P, O, G> InitiateCheckoutUseCase<L, C, P, O, G>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: PromoCodeRepository,
    O: OrderRepository,
    G: PaymentGateway,
{
    pub fn new(
        learner_repo: Arc<L>,
        course_repo: Arc<C>,
        promo_repo: Arc<P>,
        order_repo: Arc<O>,
        gateway: Arc<G>,
        config: Arc<AcademyConfig>,
    ) -> Self {
        Self {
            learner_repo,
            course_repo,
            promo_repo,
            order_repo,
            gateway,
            config,
        }
    }

    pub async fn execute(
        &self,
        identity: RequestIdentity,
        input: CheckoutInput,
    ) -> AcademyResult<CheckoutOutput> {
        let course_id = CourseId::parse(&input.course_id).ok_or(AcademyError::CourseNotFound)?;
        let user_id = identity.user_id().ok_or(AcademyError::NotAuthenticated)?;

        let learner = self
            .learner_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AcademyError::NotAuthenticated)?;

        let course = self
            .course_repo
            .find_by_id(&course_id)
            .await?
            .filter(|c| c.published || learner.is_admin())
            .ok_or(AcademyError::CourseNotFound)?;

        if learner.owns(&course.course_id) {
            return Err(AcademyError::AlreadyOwned);
        }

        let promo = self.load_promo(input.promo_code_id.as_deref()).await?;
        let quote = quote_price(&course, &learner, promo.as_ref(), Utc::now());

        if promo.is_some() && quote.discount_percent.is_none() {
            tracing::info!(
                user_id = %user_id,
                course_id = %course_id,
                "Promo code not applicable, charging full price"
            );
        }

        if !quote.final_price.is_positive() {
            return Err(AcademyError::ValidationFailed(
                "final price must be greater than zero".into(),
            ));
        }

        let applied_promo = quote
            .discount_percent
            .and(promo.as_ref().map(|p| p.promo_code_id));

        let request = CheckoutRequest {
            product_name: course.title.get(input.locale).to_string(),
            amount: quote.final_price,
            currency: self.config.currency.clone(),
            customer_email: learner.email.clone(),
            locale: input.locale,
            success_url: self.config.success_url(&course_id),
            cancel_url: self.config.cancel_url(&course_id),
            metadata: CheckoutMetadata {
                course_id,
                user_id,
                promo_code_id: applied_promo,
            },
        };

        let session = tokio::time::timeout(
            self.config.checkout_timeout,
            self.gateway.create_checkout_session(&request),
        )
        .await
        .map_err(|_| AcademyError::Timeout("checkout session creation"))??;

        let pending = Order::pending(OrderDraft {
            user_id,
            course_id,
            payment_session_id: session.session_id.clone(),
            amount: quote.final_price,
            currency: request.currency.clone(),
            promo_code_id: applied_promo,
            discount_amount: quote.discount_amount(),
        });

        // Fulfillment inserts the order itself if this row is missing
        if let Err(e) = self.order_repo.create_pending(&pending).await {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "Failed to record pending order"
            );
        }

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            session_id = %session.session_id,
            amount = quote.final_price.minor(),
            discount_percent = ?quote.discount_percent,
            "Checkout session created"
        );

        Ok(CheckoutOutput {
            url: session.url,
            session_id: session.session_id,
            amount: quote.final_price,
            currency: request.currency,
            discount_percent: quote.discount_percent,
        })
    }

    /// Malformed or unknown promo ids are ignored rather than rejected
    async fn load_promo(&self, raw: Option<&str>) -> AcademyResult<Option<PromoCode>> {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let Some(promo_id) = PromoCodeId::parse(raw) else {
            tracing::debug!(promo_code_id = %raw, "Ignoring malformed promo code id");
            return Ok(None);
        };
        self.promo_repo.find_by_id(&promo_id).await
    }
}
