//! HTTP Handlers

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect};
use std::sync::Arc;

use platform::cookie::{extract_cookie, set_cookie_header};
use platform::crypto::{constant_time_eq, random_token};

use crate::application::config::IdentityConfig;
use crate::application::{CheckSessionUseCase, SignInUseCase, SignOutUseCase};
use crate::domain::repository::{AuthSessionRepository, OAuthProvider, UserRepository};
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::dto::{OAuthCallbackQuery, SessionStatusResponse};

/// Shared state for identity handlers
#[derive(Clone)]
pub struct IdentityAppState<R, P>
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub provider: Arc<P>,
    pub config: Arc<IdentityConfig>,
}

// ============================================================================
// OAuth
// ============================================================================

/// GET /api/auth/oauth/start
///
/// Issues a one-time `state`, stores it in a short-lived cookie and sends the
/// browser to the provider.
pub async fn oauth_start<R, P>(
    State(state): State<IdentityAppState<R, P>>,
) -> IdentityResult<impl IntoResponse>
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    let oauth_state = random_token(32);
    let location = state.provider.authorize_url(&oauth_state)?;

    let cookie = state
        .config
        .oauth_state_cookie()
        .build_set_cookie(&oauth_state);

    Ok((
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
        Redirect::to(&location),
    ))
}

/// GET /api/auth/oauth/callback
pub async fn oauth_callback<R, P>(
    State(state): State<IdentityAppState<R, P>>,
    headers: HeaderMap,
    Query(query): Query<OAuthCallbackQuery>,
) -> IdentityResult<impl IntoResponse>
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    if let Some(error) = query.error {
        return Err(IdentityError::OAuthProvider(format!("authorization denied: {error}")));
    }

    let expected = extract_cookie(&headers, &state.config.oauth_state_cookie_name)
        .ok_or(IdentityError::OAuthStateMismatch)?;
    let received = query.state.ok_or(IdentityError::OAuthStateMismatch)?;
    if !constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        return Err(IdentityError::OAuthStateMismatch);
    }

    let code = query
        .code
        .ok_or_else(|| IdentityError::OAuthProvider("callback without code".into()))?;

    let profile = state.provider.exchange_code(&code).await?;

    let use_case = SignInUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());
    let output = use_case.execute(profile).await?;

    let session_cookie = state
        .config
        .session_cookie()
        .build_set_cookie(&output.session_token);
    let clear_state = state.config.oauth_state_cookie().build_delete_cookie();

    let mut response_headers = HeaderMap::new();
    response_headers.append(header::SET_COOKIE, set_cookie_header(&session_cookie));
    response_headers.append(header::SET_COOKIE, set_cookie_header(&clear_state));

    Ok((
        response_headers,
        Redirect::to(&state.config.post_sign_in_redirect),
    ))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/signout
pub async fn sign_out<R, P>(
    State(state): State<IdentityAppState<R, P>>,
    headers: HeaderMap,
) -> IdentityResult<impl IntoResponse>
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    if let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) {
        let use_case = SignOutUseCase::new(state.repo.clone(), state.config.clone());
        // Ignore errors - just clear the cookie
        let _ = use_case.execute(&token).await;
    }

    let cookie = state.config.session_cookie().build_delete_cookie();

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
    ))
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/status
pub async fn session_status<R, P>(
    State(state): State<IdentityAppState<R, P>>,
    headers: HeaderMap,
) -> IdentityResult<Json<SessionStatusResponse>>
where
    R: UserRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    P: OAuthProvider + Clone + Send + Sync + 'static,
{
    let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) else {
        return Ok(Json(SessionStatusResponse::anonymous()));
    };

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());

    match use_case.execute(state.repo.as_ref(), &token).await {
        Ok(info) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            user_id: Some(info.user_id.to_string()),
            email: Some(info.email),
            name: info.name,
            user_role: Some(info.user_role),
            expires_at_ms: Some(info.expires_at_ms),
        })),
        Err(IdentityError::SessionInvalid) => Ok(Json(SessionStatusResponse::anonymous())),
        Err(e) => Err(e),
    }
}
