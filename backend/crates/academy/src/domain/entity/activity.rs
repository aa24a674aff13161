//! User Activity
//!
//! Append-only feed of notable learner events.

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, LessonId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    CoursePurchased,
    LessonCompleted,
}

impl ActivityKind {
    pub const fn code(&self) -> &'static str {
        match self {
            ActivityKind::CoursePurchased => "course_purchased",
            ActivityKind::LessonCompleted => "lesson_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub course_id: CourseId,
    pub lesson_id: Option<LessonId>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn course_purchased(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            kind: ActivityKind::CoursePurchased,
            course_id,
            lesson_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn lesson_completed(user_id: UserId, course_id: CourseId, lesson_id: LessonId) -> Self {
        Self {
            user_id,
            kind: ActivityKind::LessonCompleted,
            course_id,
            lesson_id: Some(lesson_id),
            created_at: Utc::now(),
        }
    }
}
