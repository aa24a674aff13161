//! Validate Promo Use Case
//!
//! Lets the checkout page preview a promo code before paying. Checkout
//! re-runs the same rules, so a stale preview cannot lower the price.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{CourseId, PromoCodeId};
use kernel::identity::RequestIdentity;

use crate::domain::entity::promo_code::{PromoCode, PromoRejection};
use crate::domain::repository::{CourseRepository, LearnerRepository, PromoCodeRepository};
use crate::domain::value_object::money::Money;
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug, Clone)]
pub struct PromoValidation {
    pub valid: bool,
    pub promo_code_id: Option<PromoCodeId>,
    pub discount_percent: Option<u8>,
    pub final_price: Money,
    pub original_price: Money,
    pub reason: Option<PromoRejection>,
}

pub struct ValidatePromoUseCase<L, C, P>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: PromoCodeRepository,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
    promo_repo: Arc<P>,
}

impl<L, C, P> ValidatePromoUseCase<L, C, P>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: PromoCodeRepository,
{
    pub fn new(learner_repo: Arc<L>, course_repo: Arc<C>, promo_repo: Arc<P>) -> Self {
        Self {
            learner_repo,
            course_repo,
            promo_repo,
        }
    }

    pub async fn execute(
        &self,
        identity: RequestIdentity,
        code: &str,
        course_id: &str,
    ) -> AcademyResult<PromoValidation> {
        let user_id = identity.user_id().ok_or(AcademyError::NotAuthenticated)?;
        let code = PromoCode::normalize_code(code)?;
        let course_id = CourseId::parse(course_id).ok_or(AcademyError::CourseNotFound)?;

        self.learner_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AcademyError::NotAuthenticated)?;

        let course = self
            .course_repo
            .find_by_id(&course_id)
            .await?
            .ok_or(AcademyError::CourseNotFound)?;

        let rejected = |reason| PromoValidation {
            valid: false,
            promo_code_id: None,
            discount_percent: None,
            final_price: course.price,
            original_price: course.price,
            reason: Some(reason),
        };

        let Some(promo) = self.promo_repo.find_by_code(&code).await? else {
            return Ok(rejected(PromoRejection::NotFound));
        };

        if let Err(reason) = promo.check_applicable(&course_id, &user_id, Utc::now()) {
            tracing::debug!(
                user_id = %user_id,
                code = %promo.code,
                reason = reason.code(),
                "Promo code rejected"
            );
            return Ok(rejected(reason));
        }

        Ok(PromoValidation {
            valid: true,
            promo_code_id: Some(promo.promo_code_id),
            discount_percent: Some(promo.discount_percent),
            final_price: course.price.apply_discount(promo.discount_percent),
            original_price: course.price,
            reason: None,
        })
    }
}
