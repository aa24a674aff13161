//! PostgreSQL Repository Implementations

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use kernel::error::conversions::is_unique_violation;
use kernel::id::{CourseId, LessonFileId, LessonId, OrderId, PromoCodeId, UserId};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::entity::{
    activity::Activity,
    course::Course,
    learner::Learner,
    lesson::{Lesson, LessonFile, LessonVideo},
    order::{Order, OrderStatus},
    progress::{LessonProgress, ProgressRecorded},
    promo_code::PromoCode,
};
use crate::domain::repository::{
    ActivityRepository, CourseRepository, FulfillmentOutcome, LearnerRepository,
    OrderRepository, ProgressRepository, PromoCodeRepository,
};
use crate::domain::value_object::{
    learner_role::LearnerRole, localized_text::LocalizedText, money::Money,
};
use crate::error::{AcademyError, AcademyResult};

/// PostgreSQL-backed academy repository
#[derive(Clone)]
pub struct PgAcademyRepository {
    pool: PgPool,
}

impl PgAcademyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach lessons and files to course rows
    async fn hydrate(&self, rows: Vec<CourseRow>) -> AcademyResult<Vec<Course>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let course_ids: Vec<Uuid> = rows.iter().map(|r| r.course_id).collect();

        let lesson_rows = sqlx::query_as::<_, LessonRow>(
            r#"
            SELECT
                lesson_id,
                course_id,
                title,
                description,
                video_id,
                video_url,
                duration_secs,
                lesson_order
            FROM lessons
            WHERE course_id = ANY($1)
            ORDER BY lesson_order, created_at
            "#,
        )
        .bind(&course_ids)
        .fetch_all(&self.pool)
        .await?;

        let lesson_ids: Vec<Uuid> = lesson_rows.iter().map(|r| r.lesson_id).collect();

        let file_rows = sqlx::query_as::<_, LessonFileRow>(
            r#"
            SELECT file_id, lesson_id, file_name, content_type, size_bytes, storage_key
            FROM lesson_files
            WHERE lesson_id = ANY($1)
            ORDER BY file_name
            "#,
        )
        .bind(&lesson_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut files_by_lesson: HashMap<Uuid, Vec<LessonFile>> = HashMap::new();
        for row in file_rows {
            files_by_lesson
                .entry(row.lesson_id)
                .or_default()
                .push(row.into_file());
        }

        let mut lessons_by_course: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
        for row in lesson_rows {
            let files = files_by_lesson.remove(&row.lesson_id).unwrap_or_default();
            lessons_by_course
                .entry(row.course_id)
                .or_default()
                .push(row.into_lesson(files));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let lessons = lessons_by_course.remove(&row.course_id).unwrap_or_default();
                row.into_course(lessons)
            })
            .collect())
    }
}

// ============================================================================
// Learner Repository Implementation
// ============================================================================

impl LearnerRepository for PgAcademyRepository {
    async fn find_by_id(&self, user_id: &UserId) -> AcademyResult<Option<Learner>> {
        let row = sqlx::query_as::<_, LearnerRow>(
            r#"
            SELECT
                u.user_id,
                u.email,
                u.name,
                u.user_role,
                ARRAY(SELECT c.course_id FROM user_courses c WHERE c.user_id = u.user_id)
                    AS courses_owned,
                ARRAY(SELECT f.course_id FROM user_favorites f WHERE f.user_id = u.user_id)
                    AS favorites
            FROM users u
            WHERE u.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LearnerRow::into_learner))
    }

    async fn toggle_favorite(&self, user_id: &UserId, course_id: &CourseId) -> AcademyResult<bool> {
        // Single statement: delete if present, otherwise insert
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            WITH removed AS (
                DELETE FROM user_favorites
                WHERE user_id = $1 AND course_id = $2
                RETURNING 1
            )
            INSERT INTO user_favorites (user_id, course_id, created_at)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM removed)
            ON CONFLICT DO NOTHING
            RETURNING 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(course_id.as_uuid())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }
}

// ============================================================================
// Course Repository Implementation
// ============================================================================

const COURSE_COLUMNS: &str = r#"
    course_id,
    title,
    description,
    price,
    original_price,
    discount,
    published,
    featured,
    is_new_course,
    new_until,
    created_at,
    updated_at
"#;

impl CourseRepository for PgAcademyRepository {
    async fn list_published(&self) -> AcademyResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE published ORDER BY featured DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn find_by_id(&self, course_id: &CourseId) -> AcademyResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = $1"
        ))
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn find_lessons_by_media(
        &self,
        media_id: &str,
    ) -> AcademyResult<Vec<(CourseId, LessonId)>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT course_id, lesson_id FROM lessons WHERE video_id = $1 ORDER BY course_id, lesson_id",
        )
        .bind(media_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(course_id, lesson_id)| {
                (CourseId::from_uuid(course_id), LessonId::from_uuid(lesson_id))
            })
            .collect())
    }

    async fn find_file(
        &self,
        file_id: &LessonFileId,
    ) -> AcademyResult<Option<(CourseId, LessonFile)>> {
        let row = sqlx::query_as::<_, LessonFileWithCourseRow>(
            r#"
            SELECT
                l.course_id,
                f.file_id,
                f.lesson_id,
                f.file_name,
                f.content_type,
                f.size_bytes,
                f.storage_key
            FROM lesson_files f
            JOIN lessons l ON l.lesson_id = f.lesson_id
            WHERE f.file_id = $1
            "#,
        )
        .bind(file_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (CourseId::from_uuid(r.course_id), r.file.into_file())))
    }

    async fn update_pricing(&self, course: &Course) -> AcademyResult<()> {
        sqlx::query(
            r#"
            UPDATE courses SET
                price = $2,
                original_price = $3,
                discount = $4,
                updated_at = $5
            WHERE course_id = $1
            "#,
        )
        .bind(course.course_id.as_uuid())
        .bind(course.price.minor())
        .bind(course.original_price.minor())
        .bind(course.discount)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Order Repository Implementation
// ============================================================================

impl OrderRepository for PgAcademyRepository {
    async fn find_by_session(&self, payment_session_id: &str) -> AcademyResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT
                order_id,
                user_id,
                course_id,
                payment_session_id,
                status,
                amount,
                currency,
                promo_code_id,
                discount_amount,
                created_at,
                completed_at
            FROM orders
            WHERE payment_session_id = $1
            "#,
        )
        .bind(payment_session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn create_pending(&self, order: &Order) -> AcademyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id,
                user_id,
                course_id,
                payment_session_id,
                status,
                amount,
                currency,
                promo_code_id,
                discount_amount,
                created_at,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (payment_session_id) DO NOTHING
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.course_id.as_uuid())
        .bind(&order.payment_session_id)
        .bind(order.status.id())
        .bind(order.amount.minor())
        .bind(&order.currency)
        .bind(order.promo_code_id.map(|id| id.into_uuid()))
        .bind(order.discount_amount.minor())
        .bind(order.created_at)
        .bind(order.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fulfill(&self, order: &Order) -> AcademyResult<FulfillmentOutcome> {
        let mut tx = self.pool.begin().await?;

        // Completes a pending row or inserts a fresh one. A concurrent
        // delivery blocks on the row lock, then sees a final status and
        // matches nothing.
        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (
                order_id,
                user_id,
                course_id,
                payment_session_id,
                status,
                amount,
                currency,
                promo_code_id,
                discount_amount,
                created_at,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (payment_session_id) DO UPDATE SET
                status = EXCLUDED.status,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                promo_code_id = EXCLUDED.promo_code_id,
                discount_amount = EXCLUDED.discount_amount,
                completed_at = EXCLUDED.completed_at
            WHERE orders.status = $12
            RETURNING order_id
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.course_id.as_uuid())
        .bind(&order.payment_session_id)
        .bind(OrderStatus::Completed.id())
        .bind(order.amount.minor())
        .bind(&order.currency)
        .bind(order.promo_code_id.map(|id| id.into_uuid()))
        .bind(order.discount_amount.minor())
        .bind(order.created_at)
        .bind(order.completed_at.unwrap_or_else(Utc::now))
        .bind(OrderStatus::Pending.id())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = order_id else {
            tx.rollback().await?;
            return Ok(FulfillmentOutcome::Duplicate);
        };

        let now = Utc::now();

        if let Some(promo_code_id) = order.promo_code_id {
            let redeemed = sqlx::query(
                r#"
                INSERT INTO promo_code_redemptions (promo_code_id, user_id, order_id, redeemed_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(promo_code_id.as_uuid())
            .bind(order.user_id.as_uuid())
            .bind(order_id)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                == 1;

            if redeemed {
                sqlx::query(
                    "UPDATE promo_codes SET used_count = used_count + 1 WHERE promo_code_id = $1",
                )
                .bind(promo_code_id.as_uuid())
                .execute(&mut *tx)
                .await?;
            }
        }

        // Add-to-set: the primary key keeps each course at most once per user
        let newly_granted = sqlx::query(
            r#"
            INSERT INTO user_courses (user_id, course_id, granted_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(order.user_id.as_uuid())
        .bind(order.course_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if newly_granted {
            let activity = Activity::course_purchased(order.user_id, order.course_id);
            insert_activity(&mut *tx, &activity).await?;
        }

        tx.commit().await?;

        Ok(FulfillmentOutcome::Fulfilled { newly_granted })
    }

    async fn record_failed(&self, order: &Order) -> AcademyResult<bool> {
        let changed = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (
                order_id,
                user_id,
                course_id,
                payment_session_id,
                status,
                amount,
                currency,
                promo_code_id,
                discount_amount,
                created_at,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL)
            ON CONFLICT (payment_session_id) DO UPDATE SET
                status = EXCLUDED.status
            WHERE orders.status = $11
            RETURNING order_id
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.course_id.as_uuid())
        .bind(&order.payment_session_id)
        .bind(OrderStatus::Failed.id())
        .bind(order.amount.minor())
        .bind(&order.currency)
        .bind(order.promo_code_id.map(|id| id.into_uuid()))
        .bind(order.discount_amount.minor())
        .bind(order.created_at)
        .bind(OrderStatus::Pending.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(changed.is_some())
    }
}

// ============================================================================
// Promo Code Repository Implementation
// ============================================================================

const PROMO_SELECT: &str = r#"
    SELECT
        p.promo_code_id,
        p.code,
        p.discount_percent,
        p.expires_at,
        p.course_id,
        p.used_count,
        p.max_uses,
        p.active,
        p.created_at,
        ARRAY(
            SELECT r.user_id FROM promo_code_redemptions r
            WHERE r.promo_code_id = p.promo_code_id
        ) AS used_by
    FROM promo_codes p
"#;

impl PromoCodeRepository for PgAcademyRepository {
    async fn find_by_id(&self, promo_code_id: &PromoCodeId) -> AcademyResult<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "{PROMO_SELECT} WHERE p.promo_code_id = $1"
        ))
        .bind(promo_code_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PromoCodeRow::into_promo).transpose()
    }

    async fn find_by_code(&self, code: &str) -> AcademyResult<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!("{PROMO_SELECT} WHERE p.code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PromoCodeRow::into_promo).transpose()
    }

    async fn create(&self, promo: &PromoCode) -> AcademyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                promo_code_id,
                code,
                discount_percent,
                expires_at,
                course_id,
                used_count,
                max_uses,
                active,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(promo.promo_code_id.as_uuid())
        .bind(&promo.code)
        .bind(i16::from(promo.discount_percent))
        .bind(promo.expires_at)
        .bind(promo.course_id.map(|id| id.into_uuid()))
        .bind(promo.used_count)
        .bind(promo.max_uses)
        .bind(promo.active)
        .bind(promo.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AcademyError::PromoCodeTaken
            } else {
                AcademyError::Database(e)
            }
        })?;

        Ok(())
    }
}

// ============================================================================
// Progress Repository Implementation
// ============================================================================

impl ProgressRepository for PgAcademyRepository {
    async fn record(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
        watch_time_secs: i32,
        completed: bool,
    ) -> AcademyResult<ProgressRecorded> {
        let row = sqlx::query_as::<_, RecordedProgressRow>(
            r#"
            WITH previous AS (
                SELECT completed FROM lesson_progress
                WHERE user_id = $1 AND course_id = $2 AND lesson_id = $3
            )
            INSERT INTO lesson_progress (
                user_id,
                course_id,
                lesson_id,
                watch_time_secs,
                completed,
                completed_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN $6::timestamptz END, $6)
            ON CONFLICT (user_id, course_id, lesson_id) DO UPDATE SET
                watch_time_secs = GREATEST(lesson_progress.watch_time_secs, EXCLUDED.watch_time_secs),
                completed = lesson_progress.completed OR EXCLUDED.completed,
                completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at),
                updated_at = EXCLUDED.updated_at
            RETURNING
                user_id,
                course_id,
                lesson_id,
                watch_time_secs,
                completed,
                completed_at,
                updated_at,
                COALESCE((SELECT completed FROM previous), FALSE) AS was_completed
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(course_id.as_uuid())
        .bind(lesson_id.as_uuid())
        .bind(watch_time_secs)
        .bind(completed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let newly_completed = row.progress.completed && !row.was_completed;
        Ok(ProgressRecorded {
            progress: row.into_progress(),
            newly_completed,
        })
    }

    async fn list_for_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> AcademyResult<Vec<LessonProgress>> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT
                user_id,
                course_id,
                lesson_id,
                watch_time_secs,
                completed,
                completed_at,
                updated_at
            FROM lesson_progress
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(course_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProgressRow::into_progress).collect())
    }
}

// ============================================================================
// Activity Repository Implementation
// ============================================================================

impl ActivityRepository for PgAcademyRepository {
    async fn record(&self, activity: &Activity) -> AcademyResult<()> {
        insert_activity(&self.pool, activity).await
    }
}

async fn insert_activity<'e, E>(executor: E, activity: &Activity) -> AcademyResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO user_activity (user_id, kind, course_id, lesson_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(activity.user_id.as_uuid())
    .bind(activity.kind.code())
    .bind(activity.course_id.as_uuid())
    .bind(activity.lesson_id.map(|id| id.into_uuid()))
    .bind(activity.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct LearnerRow {
    user_id: Uuid,
    email: String,
    name: Option<String>,
    user_role: i16,
    courses_owned: Vec<Uuid>,
    favorites: Vec<Uuid>,
}

impl LearnerRow {
    fn into_learner(self) -> Learner {
        Learner {
            user_id: UserId::from_uuid(self.user_id),
            email: self.email,
            name: self.name,
            role: LearnerRole::from_id(self.user_role),
            courses_owned: to_course_set(self.courses_owned),
            favorites: to_course_set(self.favorites),
        }
    }
}

fn to_course_set(ids: Vec<Uuid>) -> HashSet<CourseId> {
    ids.into_iter().map(CourseId::from_uuid).collect()
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    course_id: Uuid,
    title: Json<LocalizedText>,
    description: Json<LocalizedText>,
    price: i64,
    original_price: i64,
    discount: i32,
    published: bool,
    featured: bool,
    is_new_course: bool,
    new_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CourseRow {
    fn into_course(self, lessons: Vec<Lesson>) -> Course {
        Course {
            course_id: CourseId::from_uuid(self.course_id),
            title: self.title.0,
            description: self.description.0,
            price: Money::from_minor(self.price),
            original_price: Money::from_minor(self.original_price),
            discount: self.discount,
            published: self.published,
            featured: self.featured,
            is_new_course: self.is_new_course,
            new_until: self.new_until,
            lessons,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    lesson_id: Uuid,
    course_id: Uuid,
    title: Json<LocalizedText>,
    description: Json<LocalizedText>,
    video_id: Option<String>,
    video_url: Option<String>,
    duration_secs: Option<i32>,
    lesson_order: i32,
}

impl LessonRow {
    fn into_lesson(self, files: Vec<LessonFile>) -> Lesson {
        Lesson {
            lesson_id: LessonId::from_uuid(self.lesson_id),
            course_id: CourseId::from_uuid(self.course_id),
            title: self.title.0,
            description: self.description.0,
            video: LessonVideo::from_columns(self.video_id, self.video_url),
            duration_secs: self.duration_secs,
            order: self.lesson_order,
            files,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LessonFileRow {
    file_id: Uuid,
    lesson_id: Uuid,
    file_name: String,
    content_type: String,
    size_bytes: i64,
    storage_key: String,
}

impl LessonFileRow {
    fn into_file(self) -> LessonFile {
        LessonFile {
            file_id: LessonFileId::from_uuid(self.file_id),
            lesson_id: LessonId::from_uuid(self.lesson_id),
            file_name: self.file_name,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            storage_key: self.storage_key,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LessonFileWithCourseRow {
    course_id: Uuid,
    #[sqlx(flatten)]
    file: LessonFileRow,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    payment_session_id: String,
    status: i16,
    amount: i64,
    currency: String,
    promo_code_id: Option<Uuid>,
    discount_amount: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self) -> AcademyResult<Order> {
        let status = OrderStatus::from_id(self.status)
            .ok_or_else(|| AcademyError::Internal(format!("Invalid order status: {}", self.status)))?;

        Ok(Order {
            order_id: OrderId::from_uuid(self.order_id),
            user_id: UserId::from_uuid(self.user_id),
            course_id: CourseId::from_uuid(self.course_id),
            payment_session_id: self.payment_session_id,
            status,
            amount: Money::from_minor(self.amount),
            currency: self.currency,
            promo_code_id: self.promo_code_id.map(PromoCodeId::from_uuid),
            discount_amount: Money::from_minor(self.discount_amount),
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PromoCodeRow {
    promo_code_id: Uuid,
    code: String,
    discount_percent: i16,
    expires_at: DateTime<Utc>,
    course_id: Option<Uuid>,
    used_count: i32,
    max_uses: Option<i32>,
    active: bool,
    created_at: DateTime<Utc>,
    used_by: Vec<Uuid>,
}

impl PromoCodeRow {
    fn into_promo(self) -> AcademyResult<PromoCode> {
        let discount_percent = u8::try_from(self.discount_percent).map_err(|_| {
            AcademyError::Internal(format!(
                "Invalid discount_percent: {}",
                self.discount_percent
            ))
        })?;

        Ok(PromoCode {
            promo_code_id: PromoCodeId::from_uuid(self.promo_code_id),
            code: self.code,
            discount_percent,
            expires_at: self.expires_at,
            course_id: self.course_id.map(CourseId::from_uuid),
            used_count: self.used_count,
            max_uses: self.max_uses,
            used_by: self.used_by.into_iter().map(UserId::from_uuid).collect(),
            active: self.active,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    user_id: Uuid,
    course_id: Uuid,
    lesson_id: Uuid,
    watch_time_secs: i32,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl ProgressRow {
    fn into_progress(self) -> LessonProgress {
        LessonProgress {
            user_id: UserId::from_uuid(self.user_id),
            course_id: CourseId::from_uuid(self.course_id),
            lesson_id: LessonId::from_uuid(self.lesson_id),
            watch_time_secs: self.watch_time_secs,
            completed: self.completed,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordedProgressRow {
    #[sqlx(flatten)]
    progress: ProgressRow,
    was_completed: bool,
}

impl RecordedProgressRow {
    fn into_progress(self) -> LessonProgress {
        self.progress.into_progress()
    }
}
