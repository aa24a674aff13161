//! Sign Out Use Case

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::session_token::verify_session_token;
use crate::domain::repository::AuthSessionRepository;
use crate::error::{IdentityError, IdentityResult};

pub struct SignOutUseCase<S>
where
    S: AuthSessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<IdentityConfig>,
}

impl<S> SignOutUseCase<S>
where
    S: AuthSessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<IdentityConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    pub async fn execute(&self, session_token: &str) -> IdentityResult<()> {
        let session_id = verify_session_token(session_token, &self.config.session_secret)
            .ok_or(IdentityError::SessionInvalid)?;
        self.session_repo.delete(session_id).await?;

        tracing::info!(session_id = %session_id, "User signed out");
        Ok(())
    }
}
