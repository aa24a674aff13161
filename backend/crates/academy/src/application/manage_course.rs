//! Manage Course Use Case
//!
//! Admin-only pricing and promo code management. The role is read from the
//! learner row on every call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::CourseId;
use kernel::identity::RequestIdentity;

use crate::domain::entity::{
    course::Course,
    promo_code::{NewPromoCode, PromoCode},
};
use crate::domain::repository::{CourseRepository, LearnerRepository, PromoCodeRepository};
use crate::domain::value_object::money::Money;
use crate::error::{AcademyError, AcademyResult};

pub struct CreatePromoInput {
    pub code: String,
    pub discount_percent: i32,
    pub expires_at: DateTime<Utc>,
    pub course_id: Option<String>,
    pub max_uses: Option<i32>,
}

pub struct ManageCourseUseCase<L, C, P>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: PromoCodeRepository,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
    promo_repo: Arc<P>,
}

impl<L, C, P> ManageCourseUseCase<L, C, P>
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

    async fn require_admin(&self, identity: RequestIdentity) -> AcademyResult<()> {
        let user_id = identity.user_id().ok_or(AcademyError::NotAuthenticated)?;
        let learner = self
            .learner_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AcademyError::NotAuthenticated)?;

        if !learner.is_admin() {
            tracing::warn!(user_id = %user_id, "Non-admin attempted an admin action");
            return Err(AcademyError::AccessDenied);
        }
        Ok(())
    }

    /// Set both prices (minor units) and recompute the discount
    pub async fn update_pricing(
        &self,
        identity: RequestIdentity,
        course_id: &str,
        price: i64,
        original_price: i64,
    ) -> AcademyResult<Course> {
        self.require_admin(identity).await?;
        let course_id = CourseId::parse(course_id).ok_or(AcademyError::CourseNotFound)?;

        let mut course = self
            .course_repo
            .find_by_id(&course_id)
            .await?
            .ok_or(AcademyError::CourseNotFound)?;

        course.set_prices(Money::from_minor(price), Money::from_minor(original_price))?;
        self.course_repo.update_pricing(&course).await?;

        tracing::info!(
            course_id = %course_id,
            price,
            original_price,
            discount = course.discount,
            "Course pricing updated"
        );

        Ok(course)
    }

    pub async fn create_promo(
        &self,
        identity: RequestIdentity,
        input: CreatePromoInput,
    ) -> AcademyResult<PromoCode> {
        self.require_admin(identity).await?;

        let course_id = match input.course_id.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let course_id = CourseId::parse(raw).ok_or(AcademyError::CourseNotFound)?;
                self.course_repo
                    .find_by_id(&course_id)
                    .await?
                    .ok_or(AcademyError::CourseNotFound)?;
                Some(course_id)
            }
            None => None,
        };

        let promo = PromoCode::create(
            NewPromoCode {
                code: input.code,
                discount_percent: input.discount_percent,
                expires_at: input.expires_at,
                course_id,
                max_uses: input.max_uses,
            },
            Utc::now(),
        )?;

        self.promo_repo.create(&promo).await?;

        tracing::info!(
            promo_code_id = %promo.promo_code_id,
            code = %promo.code,
            discount_percent = promo.discount_percent,
            "Promo code created"
        );

        Ok(promo)
    }
}
