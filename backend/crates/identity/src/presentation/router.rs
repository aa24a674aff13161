//! Identity Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::repository::{AuthSessionRepository, OAuthProvider, UserRepository};
use crate::infra::oauth::HttpOAuthProvider;
use crate::infra::postgres::PgIdentityRepository;
use crate::presentation::handlers::{self, IdentityAppState};

/// Create the identity router with PostgreSQL repository
pub fn identity_router(
    repo: PgIdentityRepository,
    provider: HttpOAuthProvider,
    config: Arc<IdentityConfig>,
) -> Router {
    identity_router_generic(repo, provider, config)
}

/// Create a generic identity router for any repository/provider implementation
pub fn identity_router_generic<R, P>(repo: R, provider: P, config: Arc<IdentityConfig>) -> Router
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    let state = IdentityAppState {
        repo: Arc::new(repo),
        provider: Arc::new(provider),
        config,
    };

    Router::new()
        .route("/oauth/start", get(handlers::oauth_start::<R, P>))
        .route("/oauth/callback", get(handlers::oauth_callback::<R, P>))
        .route("/signout", post(handlers::sign_out::<R, P>))
        .route("/status", get(handlers::session_status::<R, P>))
        .with_state(state)
}
