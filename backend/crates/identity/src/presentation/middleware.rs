//! Identity Middleware
//!
//! Resolves the session cookie into a [`RequestIdentity`] for downstream
//! handlers. It never rejects: unauthenticated requests continue as anonymous
//! and each handler decides what that means.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use kernel::identity::RequestIdentity;
use std::sync::Arc;

use crate::application::CheckSessionUseCase;
use crate::application::config::IdentityConfig;
use crate::domain::repository::AuthSessionRepository;

/// Middleware state
#[derive(Clone)]
pub struct IdentityMiddlewareState<S>
where
    S: AuthSessionRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<S>,
    pub config: Arc<IdentityConfig>,
}

impl<S> IdentityMiddlewareState<S>
where
    S: AuthSessionRepository + Clone + Send + Sync + 'static,
{
    pub fn new(repo: S, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo: Arc::new(repo),
            config,
        }
    }
}

/// Use with `axum::middleware::from_fn_with_state`
pub async fn resolve_identity<S>(
    State(state): State<IdentityMiddlewareState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    S: AuthSessionRepository + Clone + Send + Sync + 'static,
{
    let token = platform::cookie::extract_cookie(req.headers(), &state.config.session_cookie_name);

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());
    let identity = match use_case.resolve_user_id(token.as_deref()).await {
        Some(user_id) => RequestIdentity::authenticated(user_id),
        None => RequestIdentity::anonymous(),
    };

    req.extensions_mut().insert(identity);

    next.run(req).await
}
