//! Check Access Use Case
//!
//! The single entitlement checker. Every lesson, media and file endpoint goes
//! through it, and it reads the learner and course fresh on each call.
//!
//! Check order: id shape, identity, learner, course, then the role/ownership
//! rule. Any persistence error denies access.

use std::sync::Arc;

use kernel::id::{CourseId, LessonId};
use kernel::identity::RequestIdentity;

use crate::domain::entity::{course::Course, learner::Learner};
use crate::domain::repository::{CourseRepository, LearnerRepository};
use crate::domain::services::decide_access;
use crate::domain::value_object::access::{AccessDecision, AccessReason};
use crate::error::{AcademyError, AcademyResult};

/// Learner and course behind a granted decision
#[derive(Debug, Clone)]
pub struct Entitled {
    pub learner: Learner,
    pub course: Course,
}

pub struct CheckAccessUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
}

impl<L, C> CheckAccessUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    pub fn new(learner_repo: Arc<L>, course_repo: Arc<C>) -> Self {
        Self {
            learner_repo,
            course_repo,
        }
    }

    /// Course-level check from a raw path id
    pub async fn check_course(&self, identity: RequestIdentity, course_id: &str) -> AccessDecision {
        let Some(course_id) = CourseId::parse(course_id) else {
            return AccessDecision::denied(AccessReason::CourseNotFound);
        };
        self.decide(identity, course_id, None).await
    }

    /// Lesson-level check from raw path ids. A lesson missing from the course
    /// reports `course_not_found`.
    pub async fn check_lesson(
        &self,
        identity: RequestIdentity,
        course_id: &str,
        lesson_id: &str,
    ) -> AccessDecision {
        let (Some(course_id), Some(lesson_id)) =
            (CourseId::parse(course_id), LessonId::parse(lesson_id))
        else {
            return AccessDecision::denied(AccessReason::CourseNotFound);
        };
        self.decide(identity, course_id, Some(lesson_id)).await
    }

    /// For gated endpoints: the entitled learner and course, or the error the
    /// denial maps to
    pub async fn require_course(
        &self,
        identity: RequestIdentity,
        course_id: CourseId,
    ) -> AcademyResult<Entitled> {
        self.require(identity, course_id, None).await
    }

    pub async fn require_lesson(
        &self,
        identity: RequestIdentity,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> AcademyResult<Entitled> {
        self.require(identity, course_id, Some(lesson_id)).await
    }

    async fn require(
        &self,
        identity: RequestIdentity,
        course_id: CourseId,
        lesson_id: Option<LessonId>,
    ) -> AcademyResult<Entitled> {
        match self.evaluate(identity, course_id, lesson_id).await {
            Ok((_, Some(entitled))) => Ok(entitled),
            Ok((decision, None)) => Err(decision.to_error()),
            Err(e) => {
                log_check_failure(&e, &course_id);
                Err(AcademyError::AccessCheckFailed)
            }
        }
    }

    async fn decide(
        &self,
        identity: RequestIdentity,
        course_id: CourseId,
        lesson_id: Option<LessonId>,
    ) -> AccessDecision {
        match self.evaluate(identity, course_id, lesson_id).await {
            Ok((decision, _)) => decision,
            Err(e) => {
                log_check_failure(&e, &course_id);
                AccessDecision::check_failed()
            }
        }
    }

    async fn evaluate(
        &self,
        identity: RequestIdentity,
        course_id: CourseId,
        lesson_id: Option<LessonId>,
    ) -> AcademyResult<(AccessDecision, Option<Entitled>)> {
        let Some(user_id) = identity.user_id() else {
            return Ok((AccessDecision::denied(AccessReason::NotAuthenticated), None));
        };

        let Some(learner) = self.learner_repo.find_by_id(&user_id).await? else {
            return Ok((AccessDecision::denied(AccessReason::UserNotFound), None));
        };

        let Some(course) = self.course_repo.find_by_id(&course_id).await? else {
            return Ok((AccessDecision::denied(AccessReason::CourseNotFound), None));
        };

        let decision = decide_access(&learner, &course);

        if !decision.has_access {
            tracing::debug!(
                user_id = %user_id,
                course_id = %course_id,
                reason = decision.reason.code(),
                "Course access denied"
            );
            return Ok((decision, None));
        }

        if lesson_id.is_some_and(|id| !course.has_lesson(&id)) {
            let mut decision = decision;
            decision.has_access = false;
            decision.reason = AccessReason::CourseNotFound;
            return Ok((decision, None));
        }

        Ok((decision, Some(Entitled { learner, course })))
    }
}

fn log_check_failure(error: &AcademyError, course_id: &CourseId) {
    tracing::error!(
        course_id = %course_id,
        error = %error,
        "Access check failed, denying access"
    );
}
