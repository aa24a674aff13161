//! Track Progress Use Case

use std::sync::Arc;

use kernel::id::{CourseId, LessonId};
use kernel::identity::RequestIdentity;

use crate::application::check_access::CheckAccessUseCase;
use crate::domain::entity::activity::Activity;
use crate::domain::entity::progress::{LessonProgress, ProgressRecorded};
use crate::domain::repository::{
    ActivityRepository, CourseRepository, LearnerRepository, ProgressRepository,
};
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug, Clone)]
pub struct CourseProgress {
    pub lessons: Vec<LessonProgress>,
    pub completed: usize,
    pub total: usize,
}

pub struct TrackProgressUseCase<L, C, P, A>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: ProgressRepository,
    A: ActivityRepository,
{
    access: CheckAccessUseCase<L, C>,
    progress_repo: Arc<P>,
    activity_repo: Arc<A>,
}

impl<L, C, P, A> TrackProgressUseCase<L, C, P, A>
where
    L: LearnerRepository,
    C: CourseRepository,
    P: ProgressRepository,
    A: ActivityRepository,
{
    pub fn new(
        learner_repo: Arc<L>,
        course_repo: Arc<C>,
        progress_repo: Arc<P>,
        activity_repo: Arc<A>,
    ) -> Self {
        Self {
            access: CheckAccessUseCase::new(learner_repo, course_repo),
            progress_repo,
            activity_repo,
        }
    }

    pub async fn record(
        &self,
        identity: RequestIdentity,
        course_id: &str,
        lesson_id: &str,
        watch_time_secs: i32,
        completed: bool,
    ) -> AcademyResult<ProgressRecorded> {
        let (Some(course_id), Some(lesson_id)) =
            (CourseId::parse(course_id), LessonId::parse(lesson_id))
        else {
            return Err(AcademyError::CourseNotFound);
        };
        if watch_time_secs < 0 {
            return Err(AcademyError::ValidationFailed(
                "watchTime must not be negative".into(),
            ));
        }

        let entitled = self
            .access
            .require_lesson(identity, course_id, lesson_id)
            .await?;
        let user_id = entitled.learner.user_id;

        let recorded = self
            .progress_repo
            .record(&user_id, &course_id, &lesson_id, watch_time_secs, completed)
            .await?;

        if recorded.newly_completed {
            let activity = Activity::lesson_completed(user_id, course_id, lesson_id);
            if let Err(e) = self.activity_repo.record(&activity).await {
                tracing::warn!(error = %e, "Failed to record lesson completion activity");
            }
            tracing::info!(
                user_id = %user_id,
                course_id = %course_id,
                lesson_id = %lesson_id,
                "Lesson completed"
            );
        }

        Ok(recorded)
    }

    pub async fn course_progress(
        &self,
        identity: RequestIdentity,
        course_id: &str,
    ) -> AcademyResult<CourseProgress> {
        let course_id = CourseId::parse(course_id).ok_or(AcademyError::CourseNotFound)?;
        let entitled = self.access.require_course(identity, course_id).await?;

        let lessons = self
            .progress_repo
            .list_for_course(&entitled.learner.user_id, &course_id)
            .await?;

        // Progress rows for lessons since removed from the course don't count
        let completed = lessons
            .iter()
            .filter(|p| p.completed && entitled.course.has_lesson(&p.lesson_id))
            .count();

        Ok(CourseProgress {
            lessons,
            completed,
            total: entitled.course.lessons.len(),
        })
    }
}
