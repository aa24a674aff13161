//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer.

use kernel::id::{CourseId, LessonFileId, LessonId, PromoCodeId, UserId};

use crate::domain::entity::{
    activity::Activity,
    course::Course,
    learner::Learner,
    lesson::LessonFile,
    order::Order,
    progress::{LessonProgress, ProgressRecorded},
    promo_code::PromoCode,
};
use crate::error::AcademyResult;

/// Outcome of applying a completed payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Order moved to completed. `newly_granted` is false when the learner
    /// already owned the course through another order.
    Fulfilled { newly_granted: bool },
    /// The session was already completed or failed
    Duplicate,
}

#[trait_variant::make(LearnerRepository: Send)]
pub trait LocalLearnerRepository {
    /// Load a learner with role, owned courses and favorites
    async fn find_by_id(&self, user_id: &UserId) -> AcademyResult<Option<Learner>>;

    /// Flip a course in the learner's favorites; returns the new state
    async fn toggle_favorite(&self, user_id: &UserId, course_id: &CourseId) -> AcademyResult<bool>;
}

#[trait_variant::make(CourseRepository: Send)]
pub trait LocalCourseRepository {
    /// Published courses with their lessons
    async fn list_published(&self) -> AcademyResult<Vec<Course>>;

    async fn find_by_id(&self, course_id: &CourseId) -> AcademyResult<Option<Course>>;

    /// Every lesson that plays a CDN video. One video may back lessons in
    /// several courses.
    async fn find_lessons_by_media(
        &self,
        media_id: &str,
    ) -> AcademyResult<Vec<(CourseId, LessonId)>>;

    /// Locate a lesson attachment and the course it belongs to
    async fn find_file(&self, file_id: &LessonFileId)
    -> AcademyResult<Option<(CourseId, LessonFile)>>;

    /// Persist price, original price and discount
    async fn update_pricing(&self, course: &Course) -> AcademyResult<()>;
}

#[trait_variant::make(OrderRepository: Send)]
pub trait LocalOrderRepository {
    async fn find_by_session(&self, payment_session_id: &str) -> AcademyResult<Option<Order>>;

    /// Insert a pending order; an existing row for the session is left alone
    async fn create_pending(&self, order: &Order) -> AcademyResult<()>;

    /// Atomically: complete the order for this session (insert or move it out
    /// of pending), redeem the promo code, grant the course and record the
    /// purchase activity. A session that is already final yields `Duplicate`
    /// and changes nothing.
    async fn fulfill(&self, order: &Order) -> AcademyResult<FulfillmentOutcome>;

    /// Record a failed order unless the session is already final; returns
    /// whether a row changed
    async fn record_failed(&self, order: &Order) -> AcademyResult<bool>;
}

#[trait_variant::make(PromoCodeRepository: Send)]
pub trait LocalPromoCodeRepository {
    async fn find_by_id(&self, promo_code_id: &PromoCodeId) -> AcademyResult<Option<PromoCode>>;

    /// Lookup by normalized code
    async fn find_by_code(&self, code: &str) -> AcademyResult<Option<PromoCode>>;

    /// Fails with `PromoCodeTaken` when the code exists
    async fn create(&self, promo: &PromoCode) -> AcademyResult<()>;
}

#[trait_variant::make(ProgressRepository: Send)]
pub trait LocalProgressRepository {
    /// Upsert progress: watch time keeps its maximum, completion is sticky
    async fn record(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
        watch_time_secs: i32,
        completed: bool,
    ) -> AcademyResult<ProgressRecorded>;

    async fn list_for_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> AcademyResult<Vec<LessonProgress>>;
}

#[trait_variant::make(ActivityRepository: Send)]
pub trait LocalActivityRepository {
    async fn record(&self, activity: &Activity) -> AcademyResult<()>;
}

/// All academy persistence behind one store, as the HTTP layer sees it
pub trait AcademyRepository:
    LearnerRepository
    + CourseRepository
    + OrderRepository
    + PromoCodeRepository
    + ProgressRepository
    + ActivityRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> AcademyRepository for T where
    T: LearnerRepository
        + CourseRepository
        + OrderRepository
        + PromoCodeRepository
        + ProgressRepository
        + ActivityRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
