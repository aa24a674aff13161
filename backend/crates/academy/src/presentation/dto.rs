//! API DTOs (Data Transfer Objects)
//!
//! Prices go out in major units for display. Admin pricing input is taken in
//! minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{
    CheckoutOutput, CourseProgress, LessonView, MediaToken, PromoValidation, WebhookOutcome,
};
use crate::domain::entity::{
    course::Course,
    lesson::{Lesson, LessonFile, LessonVideo},
    progress::LessonProgress,
    promo_code::PromoCode,
};
use crate::domain::value_object::{access::AccessDecision, localized_text::Locale};

/// `?locale=ru|en`, defaulting to Russian
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

impl LocaleQuery {
    pub fn locale(&self) -> Locale {
        Locale::parse(self.locale.as_deref())
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummaryResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub original_price: f64,
    pub discount: i32,
    pub featured: bool,
    pub is_still_new: bool,
    pub lesson_count: usize,
}

impl CourseSummaryResponse {
    pub fn from_course(course: &Course, locale: Locale, now: DateTime<Utc>) -> Self {
        Self {
            id: course.course_id.to_string(),
            title: course.title.get(locale).to_string(),
            description: course.description.get(locale).to_string(),
            price: course.price.to_major(),
            original_price: course.original_price.to_major(),
            discount: course.discount,
            featured: course.featured,
            is_still_new: course.is_still_new(now),
            lesson_count: course.lessons.len(),
        }
    }
}

/// Lesson outline entry: no description, media or files
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOutlineResponse {
    pub id: String,
    pub title: String,
    pub order: i32,
    pub duration_secs: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub summary: CourseSummaryResponse,
    pub lessons: Vec<LessonOutlineResponse>,
}

impl CourseDetailResponse {
    pub fn from_course(course: &Course, locale: Locale, now: DateTime<Utc>) -> Self {
        Self {
            summary: CourseSummaryResponse::from_course(course, locale, now),
            lessons: course
                .ordered_lessons()
                .into_iter()
                .map(|lesson| LessonOutlineResponse {
                    id: lesson.lesson_id.to_string(),
                    title: lesson.title.get(locale).to_string(),
                    order: lesson.order,
                    duration_secs: lesson.duration_secs,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonVideoResponse {
    pub kind: &'static str,
    pub video_id: Option<String>,
    pub url: Option<String>,
}

impl From<&LessonVideo> for LessonVideoResponse {
    fn from(video: &LessonVideo) -> Self {
        let (video_id, url) = match video {
            LessonVideo::Cdn { video_id } => (Some(video_id.clone()), None),
            LessonVideo::Legacy { url } => (None, Some(url.clone())),
            LessonVideo::None => (None, None),
        };
        Self {
            kind: video.kind(),
            video_id,
            url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonFileResponse {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl From<&LessonFile> for LessonFileResponse {
    fn from(file: &LessonFile) -> Self {
        Self {
            id: file.file_id.to_string(),
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    pub id: String,
    pub course_id: String,
    pub course_title: String,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub duration_secs: Option<i32>,
    pub video: LessonVideoResponse,
    pub files: Vec<LessonFileResponse>,
    pub previous_lesson_id: Option<String>,
    pub next_lesson_id: Option<String>,
}

impl LessonResponse {
    pub fn from_view(view: &LessonView, locale: Locale) -> Self {
        let lesson: &Lesson = &view.lesson;
        Self {
            id: lesson.lesson_id.to_string(),
            course_id: view.course.course_id.to_string(),
            course_title: view.course.title.get(locale).to_string(),
            title: lesson.title.get(locale).to_string(),
            description: lesson.description.get(locale).to_string(),
            order: lesson.order,
            duration_secs: lesson.duration_secs,
            video: LessonVideoResponse::from(&lesson.video),
            files: lesson.files.iter().map(LessonFileResponse::from).collect(),
            previous_lesson_id: view.previous_lesson_id.map(|id| id.to_string()),
            next_lesson_id: view.next_lesson_id.map(|id| id.to_string()),
        }
    }
}

// ============================================================================
// Access
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub has_access: bool,
    pub reason: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<&'static str>,
}

impl AccessResponse {
    pub fn from_decision(decision: &AccessDecision, locale: Locale) -> Self {
        Self {
            has_access: decision.has_access,
            reason: decision.reason.code(),
            message: decision.message(),
            course_title: decision
                .course_title
                .as_ref()
                .map(|t| t.get(locale).to_string()),
            course_price: decision.course_price.map(|p| p.to_major()),
            user_role: decision.user_role.map(|r| r.code()),
        }
    }
}

// ============================================================================
// Checkout
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestBody {
    pub course_id: String,
    pub promo_code_id: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
}

impl From<CheckoutOutput> for CheckoutResponse {
    fn from(output: CheckoutOutput) -> Self {
        Self {
            url: output.url,
            session_id: output.session_id,
            amount: output.amount.to_major(),
            currency: output.currency,
            discount_percent: output.discount_percent,
        }
    }
}

// ============================================================================
// Promo Codes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    pub code: String,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
    pub final_price: f64,
    pub original_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<PromoValidation> for PromoValidationResponse {
    fn from(validation: PromoValidation) -> Self {
        Self {
            valid: validation.valid,
            promo_code_id: validation.promo_code_id.map(|id| id.to_string()),
            discount_percent: validation.discount_percent,
            final_price: validation.final_price.to_major(),
            original_price: validation.original_price.to_major(),
            reason: validation.reason.map(|r| r.code()),
        }
    }
}

// ============================================================================
// Webhook
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

impl WebhookResponse {
    pub fn new(outcome: WebhookOutcome) -> Self {
        Self {
            received: true,
            outcome,
        }
    }
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTokenResponse {
    pub token: String,
    pub expires: i64,
    pub expires_in: i64,
    pub media_id: String,
    pub url: String,
}

impl From<MediaToken> for MediaTokenResponse {
    fn from(token: MediaToken) -> Self {
        Self {
            token: token.token,
            expires: token.expires,
            expires_in: token.expires_in,
            media_id: token.media_id,
            url: token.url,
        }
    }
}

// ============================================================================
// Progress & Favorites
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub watch_time: i32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressResponse {
    pub lesson_id: String,
    pub watch_time: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&LessonProgress> for LessonProgressResponse {
    fn from(progress: &LessonProgress) -> Self {
        Self {
            lesson_id: progress.lesson_id.to_string(),
            watch_time: progress.watch_time_secs,
            completed: progress.completed,
            completed_at: progress.completed_at,
            updated_at: progress.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    pub lessons: Vec<LessonProgressResponse>,
    pub completed: usize,
    pub total: usize,
}

impl From<&CourseProgress> for CourseProgressResponse {
    fn from(progress: &CourseProgress) -> Self {
        Self {
            lessons: progress
                .lessons
                .iter()
                .map(LessonProgressResponse::from)
                .collect(),
            completed: progress.completed,
            total: progress.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteResponse {
    pub favorite: bool,
}

// ============================================================================
// Admin
// ============================================================================

/// Prices in minor units
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePricingRequest {
    pub price: i64,
    pub original_price: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePricingResponse {
    pub course_id: String,
    pub price: f64,
    pub original_price: f64,
    pub discount: i32,
}

impl From<&Course> for CoursePricingResponse {
    fn from(course: &Course) -> Self {
        Self {
            course_id: course.course_id.to_string(),
            price: course.price.to_major(),
            original_price: course.original_price.to_major(),
            discount: course.discount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoRequest {
    pub code: String,
    pub discount_percent: i32,
    pub expires_at: DateTime<Utc>,
    pub course_id: Option<String>,
    pub max_uses: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeResponse {
    pub id: String,
    pub code: String,
    pub discount_percent: u8,
    pub expires_at: DateTime<Utc>,
    pub course_id: Option<String>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub active: bool,
}

impl From<&PromoCode> for PromoCodeResponse {
    fn from(promo: &PromoCode) -> Self {
        Self {
            id: promo.promo_code_id.to_string(),
            code: promo.code.clone(),
            discount_percent: promo.discount_percent,
            expires_at: promo.expires_at,
            course_id: promo.course_id.map(|id| id.to_string()),
            max_uses: promo.max_uses,
            used_count: promo.used_count,
            active: promo.active,
        }
    }
}
