//! Fulfill Payment Use Case
//!
//! Consumes verified payment webhook events. A completed checkout becomes a
//! completed order plus a course grant exactly once per payment session, no
//! matter how often or how concurrently the provider re-delivers it.

use std::sync::Arc;

use kernel::error::conversions::is_unique_violation;
use serde::Serialize;

use crate::application::config::AcademyConfig;
use crate::domain::entity::order::{Order, OrderDraft};
use crate::domain::payment::{CompletedCheckout, FailedCheckout, PaymentEvent, PaymentGateway};
use crate::domain::repository::{
    CourseRepository, FulfillmentOutcome, LearnerRepository, OrderRepository,
};
use crate::domain::value_object::money::Money;
use crate::error::{AcademyError, AcademyResult};

/// What happened to a webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Fulfilled,
    /// Redelivery of an already processed session
    Duplicate,
    FailedRecorded,
    Ignored,
    /// Permanent problem with the event; acknowledged so it is not retried
    Rejected,
}

pub struct FulfillPaymentUseCase<L, C, O, G>
where
    L: LearnerRepository,
    C: CourseRepository,
    O: OrderRepository,
    G: PaymentGateway,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
    order_repo: Arc<O>,
    gateway: Arc<G>,
    config: Arc<AcademyConfig>,
}

impl<L, C, O, G> FulfillPaymentUseCase<L, C, O, G>
where
    L: LearnerRepository,
    C: CourseRepository,
    O: OrderRepository,
    G: PaymentGateway,
{
    pub fn new(
        learner_repo: Arc<L>,
        course_repo: Arc<C>,
        order_repo: Arc<O>,
        gateway: Arc<G>,
        config: Arc<AcademyConfig>,
    ) -> Self {
        Self {
            learner_repo,
            course_repo,
            order_repo,
            gateway,
            config,
        }
    }

    /// Verify, decode and apply one delivery
    pub async fn execute(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> AcademyResult<WebhookOutcome> {
        let event = self.gateway.parse_webhook(payload, signature_header)?;

        tokio::time::timeout(self.config.webhook_timeout, self.process(event))
            .await
            .map_err(|_| AcademyError::Timeout("webhook processing"))?
    }

    async fn process(&self, event: PaymentEvent) -> AcademyResult<WebhookOutcome> {
        match event {
            PaymentEvent::CheckoutCompleted(checkout) => self.fulfill(checkout).await,
            PaymentEvent::CheckoutExpired(failure) => {
                Ok(self.record_failure(failure, "checkout expired").await)
            }
            PaymentEvent::PaymentFailed(failure) => {
                Ok(self.record_failure(failure, "payment failed").await)
            }
            PaymentEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Ignoring payment event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn fulfill(&self, checkout: CompletedCheckout) -> AcademyResult<WebhookOutcome> {
        let metadata = checkout.metadata;

        if let Some(existing) = self
            .order_repo
            .find_by_session(&checkout.session_id)
            .await?
            .filter(|o| o.status.is_final())
        {
            tracing::info!(
                session_id = %checkout.session_id,
                status = existing.status.code(),
                "Duplicate payment event ignored"
            );
            return Ok(WebhookOutcome::Duplicate);
        }

        self.learner_repo
            .find_by_id(&metadata.user_id)
            .await?
            .ok_or(AcademyError::UserNotFound)?;

        let course = self
            .course_repo
            .find_by_id(&metadata.course_id)
            .await?
            .ok_or(AcademyError::CourseNotFound)?;

        let discount_amount = match metadata.promo_code_id {
            Some(_) => course.price.saturating_sub(checkout.amount_total),
            None => Money::ZERO,
        };

        let order = Order::completed(OrderDraft {
            user_id: metadata.user_id,
            course_id: metadata.course_id,
            payment_session_id: checkout.session_id.clone(),
            amount: checkout.amount_total,
            currency: checkout.currency,
            promo_code_id: metadata.promo_code_id,
            discount_amount,
        });

        let outcome = match self.order_repo.fulfill(&order).await {
            Ok(outcome) => outcome,
            Err(AcademyError::Database(e)) if is_unique_violation(&e) => {
                FulfillmentOutcome::Duplicate
            }
            Err(e) => return Err(e),
        };

        match outcome {
            FulfillmentOutcome::Fulfilled { newly_granted } => {
                tracing::info!(
                    event_id = %checkout.event_id,
                    session_id = %checkout.session_id,
                    user_id = %metadata.user_id,
                    course_id = %metadata.course_id,
                    amount = order.amount.minor(),
                    promo_code_id = ?metadata.promo_code_id,
                    newly_granted,
                    "Order fulfilled"
                );
                Ok(WebhookOutcome::Fulfilled)
            }
            FulfillmentOutcome::Duplicate => {
                tracing::info!(
                    session_id = %checkout.session_id,
                    "Duplicate payment event ignored"
                );
                Ok(WebhookOutcome::Duplicate)
            }
        }
    }

    /// Best effort: the payment already failed, so storage problems are
    /// logged and the delivery is still acknowledged.
    async fn record_failure(&self, failure: FailedCheckout, cause: &'static str) -> WebhookOutcome {
        let Some(metadata) = failure.metadata else {
            tracing::warn!(
                event_id = %failure.event_id,
                reference = %failure.reference,
                cause,
                "Failure event without usable metadata"
            );
            return WebhookOutcome::Ignored;
        };

        let order = Order::failed(OrderDraft {
            user_id: metadata.user_id,
            course_id: metadata.course_id,
            payment_session_id: failure.reference.clone(),
            amount: Money::ZERO,
            currency: self.config.currency.clone(),
            promo_code_id: metadata.promo_code_id,
            discount_amount: Money::ZERO,
        });

        match self.order_repo.record_failed(&order).await {
            Ok(true) => {
                tracing::info!(
                    reference = %failure.reference,
                    user_id = %metadata.user_id,
                    course_id = %metadata.course_id,
                    cause,
                    "Failed order recorded"
                );
                WebhookOutcome::FailedRecorded
            }
            Ok(false) => {
                tracing::info!(
                    reference = %failure.reference,
                    cause,
                    "Order already final, failure event ignored"
                );
                WebhookOutcome::Duplicate
            }
            Err(e) => {
                tracing::error!(
                    reference = %failure.reference,
                    error = %e,
                    cause,
                    "Failed to record failed order"
                );
                WebhookOutcome::Ignored
            }
        }
    }
}
