//! Favorites Use Case

use std::sync::Arc;

use kernel::id::CourseId;
use kernel::identity::RequestIdentity;

use crate::domain::repository::{CourseRepository, LearnerRepository};
use crate::error::{AcademyError, AcademyResult};

pub struct ToggleFavoriteUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    learner_repo: Arc<L>,
    course_repo: Arc<C>,
}

impl<L, C> ToggleFavoriteUseCase<L, C>
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

    /// Returns whether the course is a favorite afterwards
    pub async fn execute(&self, identity: RequestIdentity, course_id: &str) -> AcademyResult<bool> {
        let user_id = identity.user_id().ok_or(AcademyError::NotAuthenticated)?;
        let course_id = CourseId::parse(course_id).ok_or(AcademyError::CourseNotFound)?;

        self.course_repo
            .find_by_id(&course_id)
            .await?
            .ok_or(AcademyError::CourseNotFound)?;

        self.learner_repo.toggle_favorite(&user_id, &course_id).await
    }
}
