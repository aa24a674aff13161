//! Catalog Use Case
//!
//! Public course listing and outlines, plus the gated full-lesson view.

use std::sync::Arc;

use kernel::id::{CourseId, LessonId};
use kernel::identity::RequestIdentity;

use crate::application::check_access::CheckAccessUseCase;
use crate::domain::entity::{course::Course, lesson::Lesson};
use crate::domain::repository::{CourseRepository, LearnerRepository};
use crate::error::{AcademyError, AcademyResult};

/// A lesson together with its neighbours in navigation order
#[derive(Debug, Clone)]
pub struct LessonView {
    pub course: Course,
    pub lesson: Lesson,
    pub previous_lesson_id: Option<LessonId>,
    pub next_lesson_id: Option<LessonId>,
}

pub struct CatalogUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    access: CheckAccessUseCase<L, C>,
    course_repo: Arc<C>,
}

impl<L, C> CatalogUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    pub fn new(learner_repo: Arc<L>, course_repo: Arc<C>) -> Self {
        Self {
            access: CheckAccessUseCase::new(learner_repo, course_repo.clone()),
            course_repo,
        }
    }

    /// Published courses: featured first, then newest
    pub async fn list(&self) -> AcademyResult<Vec<Course>> {
        let mut courses = self.course_repo.list_published().await?;
        sort_for_listing(&mut courses);
        Ok(courses)
    }

    /// Course with its lessons sorted by `order`. Unpublished courses are
    /// hidden.
    pub async fn detail(&self, course_id: &str) -> AcademyResult<Course> {
        let course_id = CourseId::parse(course_id).ok_or(AcademyError::CourseNotFound)?;
        let mut course = self
            .course_repo
            .find_by_id(&course_id)
            .await?
            .filter(|c| c.published)
            .ok_or(AcademyError::CourseNotFound)?;

        course.lessons.sort_by_key(|l| l.order);
        Ok(course)
    }

    /// Full lesson, only for entitled learners
    pub async fn lesson(
        &self,
        identity: RequestIdentity,
        course_id: &str,
        lesson_id: &str,
    ) -> AcademyResult<LessonView> {
        let (Some(course_id), Some(lesson_id)) =
            (CourseId::parse(course_id), LessonId::parse(lesson_id))
        else {
            return Err(AcademyError::CourseNotFound);
        };

        let entitled = self
            .access
            .require_lesson(identity, course_id, lesson_id)
            .await?;
        let course = entitled.course;

        let (previous_lesson_id, next_lesson_id) = course.adjacent_lessons(&lesson_id);
        let lesson = course
            .find_lesson(&lesson_id)
            .cloned()
            .ok_or(AcademyError::LessonNotFound)?;

        Ok(LessonView {
            course,
            lesson,
            previous_lesson_id,
            next_lesson_id,
        })
    }
}

fn sort_for_listing(courses: &mut [Course]) {
    courses.sort_by(|a, b| {
        b.featured
            .cmp(&a.featured)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

