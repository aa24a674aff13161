//! HTTP Handlers

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use kernel::identity::RequestIdentity;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::application::{
    AcademyConfig, CatalogUseCase, CheckAccessUseCase, CheckoutInput, CreatePromoInput,
    DownloadFileUseCase, FileDownload, FulfillPaymentUseCase, InitiateCheckoutUseCase,
    ManageCourseUseCase, MediaAccessUseCase, ToggleFavoriteUseCase, TrackProgressUseCase,
    ValidatePromoUseCase, WebhookOutcome,
};
use crate::domain::payment::PaymentGateway;
use crate::domain::repository::AcademyRepository;
use crate::domain::storage::BlobStore;
use crate::domain::value_object::localized_text::Locale;
use crate::error::{AcademyError, AcademyResult};
use crate::infra::stripe::SIGNATURE_HEADER;
use crate::presentation::dto::{
    AccessResponse, CheckoutRequestBody, CheckoutResponse, CourseDetailResponse,
    CourseProgressResponse, CoursePricingResponse, CourseSummaryResponse, CreatePromoRequest,
    FavoriteResponse, LessonProgressResponse, LessonResponse, LocaleQuery, MediaTokenResponse,
    ProgressRequest, PromoCodeResponse, PromoValidationResponse, UpdatePricingRequest,
    ValidatePromoRequest, WebhookResponse,
};

/// Shared state for academy handlers
#[derive(Clone)]
pub struct AcademyAppState<R, G, B>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub gateway: Arc<G>,
    pub blobs: Arc<B>,
    pub config: Arc<AcademyConfig>,
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /api/courses
pub async fn list_courses<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    Query(query): Query<LocaleQuery>,
) -> AcademyResult<Json<Vec<CourseSummaryResponse>>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = CatalogUseCase::new(state.repo.clone(), state.repo.clone());
    let courses = use_case.list().await?;

    let locale = query.locale();
    let now = Utc::now();
    Ok(Json(
        courses
            .iter()
            .map(|course| CourseSummaryResponse::from_course(course, locale, now))
            .collect(),
    ))
}

/// GET /api/courses/{course_id}
pub async fn course_detail<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    Path(course_id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> AcademyResult<Json<CourseDetailResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = CatalogUseCase::new(state.repo.clone(), state.repo.clone());
    let course = use_case.detail(&course_id).await?;

    Ok(Json(CourseDetailResponse::from_course(
        &course,
        query.locale(),
        Utc::now(),
    )))
}

/// GET /api/courses/{course_id}/lessons/{lesson_id}
pub async fn lesson_detail<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path((course_id, lesson_id)): Path<(String, String)>,
    Query(query): Query<LocaleQuery>,
) -> AcademyResult<Json<LessonResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = CatalogUseCase::new(state.repo.clone(), state.repo.clone());
    let view = use_case.lesson(identity, &course_id, &lesson_id).await?;

    Ok(Json(LessonResponse::from_view(&view, query.locale())))
}

// ============================================================================
// Access
// ============================================================================

/// GET /api/courses/{course_id}/access
///
/// Always answers 200 with a decision; denials are data, not errors.
pub async fn course_access<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(course_id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Json<AccessResponse>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = CheckAccessUseCase::new(state.repo.clone(), state.repo.clone());
    let decision = use_case.check_course(identity, &course_id).await;

    Json(AccessResponse::from_decision(&decision, query.locale()))
}

/// GET /api/courses/{course_id}/lessons/{lesson_id}/access
pub async fn lesson_access<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path((course_id, lesson_id)): Path<(String, String)>,
    Query(query): Query<LocaleQuery>,
) -> Json<AccessResponse>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = CheckAccessUseCase::new(state.repo.clone(), state.repo.clone());
    let decision = use_case
        .check_lesson(identity, &course_id, &lesson_id)
        .await;

    Json(AccessResponse::from_decision(&decision, query.locale()))
}

// ============================================================================
// Checkout & Promo Codes
// ============================================================================

/// POST /api/checkout
pub async fn create_checkout<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Json(body): Json<CheckoutRequestBody>,
) -> AcademyResult<Json<CheckoutResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = InitiateCheckoutUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.gateway.clone(),
        state.config.clone(),
    );

    let output = use_case
        .execute(
            identity,
            CheckoutInput {
                course_id: body.course_id,
                promo_code_id: body.promo_code_id,
                locale: Locale::parse(body.locale.as_deref()),
            },
        )
        .await?;

    Ok(Json(CheckoutResponse::from(output)))
}

/// POST /api/promo-codes/validate
pub async fn validate_promo<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Json(body): Json<ValidatePromoRequest>,
) -> AcademyResult<Json<PromoValidationResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case =
        ValidatePromoUseCase::new(state.repo.clone(), state.repo.clone(), state.repo.clone());
    let validation = use_case
        .execute(identity, &body.code, &body.course_id)
        .await?;

    Ok(Json(PromoValidationResponse::from(validation)))
}

// ============================================================================
// Payment Webhook
// ============================================================================

/// POST /api/webhooks/payment
///
/// Transient failures answer 5xx so the provider re-delivers. Permanent ones
/// are acknowledged with `outcome: rejected`.
pub async fn payment_webhook<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let use_case = FulfillPaymentUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.gateway.clone(),
        state.config.clone(),
    );

    match use_case.execute(&body, signature).await {
        Ok(outcome) => Json(WebhookResponse::new(outcome)).into_response(),
        Err(e @ AcademyError::InvalidSignature(_)) => e.into_response(),
        Err(e) if e.is_transient() => e.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, code = e.code(), "Payment event rejected");
            Json(WebhookResponse::new(WebhookOutcome::Rejected)).into_response()
        }
    }
}

// ============================================================================
// Media & Files
// ============================================================================

/// GET /api/media/{media_id}/token
pub async fn media_token<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(media_id): Path<String>,
) -> AcademyResult<Json<MediaTokenResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case =
        MediaAccessUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());
    let token = use_case.issue_token(identity, &media_id).await?;

    Ok(Json(MediaTokenResponse::from(token)))
}

/// GET /api/files/{file_id}
///
/// Streams the blob; a read error mid-stream aborts the body instead of
/// truncating it silently.
pub async fn download_file<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(file_id): Path<String>,
) -> AcademyResult<Response>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case =
        DownloadFileUseCase::new(state.repo.clone(), state.repo.clone(), state.blobs.clone());
    let FileDownload { file, blob } = use_case.open(identity, &file_id).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.file_name))
        .map_err(|e| AcademyError::Internal(format!("Invalid Content-Disposition: {e}")))?;

    let body = Body::from_stream(ReaderStream::new(blob.reader));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(blob.size)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form
pub(crate) fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

// ============================================================================
// Progress & Favorites
// ============================================================================

/// POST /api/courses/{course_id}/lessons/{lesson_id}/progress
pub async fn record_progress<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path((course_id, lesson_id)): Path<(String, String)>,
    Json(body): Json<ProgressRequest>,
) -> AcademyResult<Json<LessonProgressResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = TrackProgressUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
    );
    let recorded = use_case
        .record(
            identity,
            &course_id,
            &lesson_id,
            body.watch_time,
            body.completed,
        )
        .await?;

    Ok(Json(LessonProgressResponse::from(&recorded.progress)))
}

/// GET /api/courses/{course_id}/progress
pub async fn course_progress<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(course_id): Path<String>,
) -> AcademyResult<Json<CourseProgressResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = TrackProgressUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
    );
    let progress = use_case.course_progress(identity, &course_id).await?;

    Ok(Json(CourseProgressResponse::from(&progress)))
}

/// POST /api/courses/{course_id}/favorite
pub async fn toggle_favorite<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(course_id): Path<String>,
) -> AcademyResult<Json<FavoriteResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case = ToggleFavoriteUseCase::new(state.repo.clone(), state.repo.clone());
    let favorite = use_case.execute(identity, &course_id).await?;

    Ok(Json(FavoriteResponse { favorite }))
}

// ============================================================================
// Admin
// ============================================================================

/// PUT /api/admin/courses/{course_id}/pricing
pub async fn update_pricing<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Path(course_id): Path<String>,
    Json(body): Json<UpdatePricingRequest>,
) -> AcademyResult<Json<CoursePricingResponse>>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case =
        ManageCourseUseCase::new(state.repo.clone(), state.repo.clone(), state.repo.clone());
    let course = use_case
        .update_pricing(identity, &course_id, body.price, body.original_price)
        .await?;

    Ok(Json(CoursePricingResponse::from(&course)))
}

/// POST /api/admin/promo-codes
pub async fn create_promo_code<R, G, B>(
    State(state): State<AcademyAppState<R, G, B>>,
    identity: RequestIdentity,
    Json(body): Json<CreatePromoRequest>,
) -> AcademyResult<impl IntoResponse>
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let use_case =
        ManageCourseUseCase::new(state.repo.clone(), state.repo.clone(), state.repo.clone());
    let promo = use_case
        .create_promo(
            identity,
            CreatePromoInput {
                code: body.code,
                discount_percent: body.discount_percent,
                expires_at: body.expires_at,
                course_id: body.course_id,
                max_uses: body.max_uses,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PromoCodeResponse::from(&promo))))
}
