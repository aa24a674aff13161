//! Academy Router

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;

use crate::application::AcademyConfig;
use crate::domain::payment::PaymentGateway;
use crate::domain::repository::AcademyRepository;
use crate::domain::storage::BlobStore;
use crate::infra::blob_store::FsBlobStore;
use crate::infra::postgres::PgAcademyRepository;
use crate::infra::stripe::StripeGateway;
use crate::presentation::handlers::{self, AcademyAppState};

/// Create the academy router with PostgreSQL, Stripe and filesystem storage
pub fn academy_router(
    repo: PgAcademyRepository,
    gateway: StripeGateway,
    blobs: FsBlobStore,
    config: Arc<AcademyConfig>,
) -> Router {
    academy_router_generic(repo, gateway, blobs, config)
}

/// Create a generic academy router for any repository/gateway/storage
pub fn academy_router_generic<R, G, B>(
    repo: R,
    gateway: G,
    blobs: B,
    config: Arc<AcademyConfig>,
) -> Router
where
    R: AcademyRepository,
    G: PaymentGateway + Clone + Send + Sync + 'static,
    B: BlobStore + Clone + Send + Sync + 'static,
{
    let state = AcademyAppState {
        repo: Arc::new(repo),
        gateway: Arc::new(gateway),
        blobs: Arc::new(blobs),
        config,
    };

    Router::new()
        // Catalog & access
        .route("/courses", get(handlers::list_courses::<R, G, B>))
        .route("/courses/{course_id}", get(handlers::course_detail::<R, G, B>))
        .route(
            "/courses/{course_id}/access",
            get(handlers::course_access::<R, G, B>),
        )
        .route(
            "/courses/{course_id}/lessons/{lesson_id}",
            get(handlers::lesson_detail::<R, G, B>),
        )
        .route(
            "/courses/{course_id}/lessons/{lesson_id}/access",
            get(handlers::lesson_access::<R, G, B>),
        )
        // Progress & favorites
        .route(
            "/courses/{course_id}/lessons/{lesson_id}/progress",
            post(handlers::record_progress::<R, G, B>),
        )
        .route(
            "/courses/{course_id}/progress",
            get(handlers::course_progress::<R, G, B>),
        )
        .route(
            "/courses/{course_id}/favorite",
            post(handlers::toggle_favorite::<R, G, B>),
        )
        // Purchase
        .route("/checkout", post(handlers::create_checkout::<R, G, B>))
        .route(
            "/promo-codes/validate",
            post(handlers::validate_promo::<R, G, B>),
        )
        .route(
            "/webhooks/payment",
            post(handlers::payment_webhook::<R, G, B>),
        )
        // Protected content
        .route(
            "/media/{media_id}/token",
            get(handlers::media_token::<R, G, B>),
        )
        .route("/files/{file_id}", get(handlers::download_file::<R, G, B>))
        // Admin
        .route(
            "/admin/courses/{course_id}/pricing",
            put(handlers::update_pricing::<R, G, B>),
        )
        .route(
            "/admin/promo-codes",
            post(handlers::create_promo_code::<R, G, B>),
        )
        .with_state(state)
}
