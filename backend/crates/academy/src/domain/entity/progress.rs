//! Lesson Progress Entity

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, LessonId, UserId};

/// Progress of one user on one lesson; unique per (user, course, lesson)
#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
    /// Seconds watched; never decreases
    pub watch_time_secs: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    pub fn new(user_id: UserId, course_id: CourseId, lesson_id: LessonId) -> Self {
        Self {
            user_id,
            course_id,
            lesson_id,
            watch_time_secs: 0,
            completed: false,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Merge a progress report. Returns `true` when this report completed the
    /// lesson for the first time.
    pub fn apply(&mut self, watch_time_secs: i32, completed: bool, now: DateTime<Utc>) -> bool {
        self.watch_time_secs = self.watch_time_secs.max(watch_time_secs.max(0));
        self.updated_at = now;

        if completed && !self.completed {
            self.completed = true;
            self.completed_at = Some(now);
            return true;
        }
        false
    }
}

/// Result of recording progress
#[derive(Debug, Clone)]
pub struct ProgressRecorded {
    pub progress: LessonProgress,
    pub newly_completed: bool,
}
