//! Check Session Use Case
//!
//! Verifies a session cookie and resolves the user behind it.

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::IdentityConfig;
use crate::application::session_token::verify_session_token;
use crate::domain::entity::auth_session::AuthSession;
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::error::{IdentityError, IdentityResult};

/// Session info output
pub struct SessionInfoOutput {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub user_role: String,
    pub expires_at_ms: i64,
}

pub struct CheckSessionUseCase<S>
where
    S: AuthSessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<IdentityConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: AuthSessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<IdentityConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    /// Get the live session behind a cookie token
    pub async fn get_session(&self, session_token: &str) -> IdentityResult<AuthSession> {
        let session_id = verify_session_token(session_token, &self.config.session_secret)
            .ok_or(IdentityError::SessionInvalid)?;

        let session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(IdentityError::SessionInvalid)?;

        if session.is_expired() {
            self.session_repo.delete(session_id).await?;
            return Err(IdentityError::SessionInvalid);
        }

        Ok(session)
    }

    /// Resolve the caller for middleware use. Never fails: any problem means
    /// "anonymous".
    pub async fn resolve_user_id(&self, session_token: Option<&str>) -> Option<UserId> {
        let token = session_token?;
        match self.get_session(token).await {
            Ok(session) => Some(session.user_id),
            Err(IdentityError::SessionInvalid) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating caller as anonymous");
                None
            }
        }
    }

    /// Session plus the current user row, for the status endpoint
    pub async fn execute<U>(
        &self,
        user_repo: &U,
        session_token: &str,
    ) -> IdentityResult<SessionInfoOutput>
    where
        U: UserRepository,
    {
        let session = self.get_session(session_token).await?;
        let user = user_repo
            .find_by_id(&session.user_id)
            .await?
            .ok_or(IdentityError::SessionInvalid)?;

        Ok(SessionInfoOutput {
            user_id: user.user_id,
            email: user.email.to_string(),
            name: user.name,
            user_role: user.user_role.code().to_string(),
            expires_at_ms: session.expires_at_ms,
        })
    }
}
