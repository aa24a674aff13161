//! Sign In Use Case
//!
//! Turns a verified OAuth profile into a user record and a fresh session.

use std::sync::Arc;

use kernel::error::conversions::is_unique_violation;
use kernel::id::UserId;

use crate::application::config::IdentityConfig;
use crate::application::session_token::sign_session_token;
use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthSessionRepository, OAuthProfile, UserRepository};
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::{IdentityError, IdentityResult};

pub struct SignInOutput {
    /// Session token for cookie
    pub session_token: String,
    pub user_id: UserId,
    pub user_role: UserRole,
    pub is_new_user: bool,
}

pub struct SignInUseCase<U, S>
where
    U: UserRepository,
    S: AuthSessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    config: Arc<IdentityConfig>,
}

impl<U, S> SignInUseCase<U, S>
where
    U: UserRepository,
    S: AuthSessionRepository,
{
    pub fn new(user_repo: Arc<U>, session_repo: Arc<S>, config: Arc<IdentityConfig>) -> Self {
        Self {
            user_repo,
            session_repo,
            config,
        }
    }

    pub async fn execute(&self, profile: OAuthProfile) -> IdentityResult<SignInOutput> {
        if !profile.email_verified {
            return Err(IdentityError::EmailNotVerified);
        }

        let email = Email::new(profile.email)?;
        let name = profile
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (mut user, is_new_user) = self.find_or_create(email, name.clone()).await?;

        user.record_login(name);

        if self.config.is_break_glass_admin(&user.email) && !user.user_role.is_admin() {
            user.set_role(UserRole::Admin);
            tracing::warn!(
                user_id = %user.user_id,
                email = %user.email,
                "Provisioned break-glass administrator"
            );
        }

        self.user_repo.update(&user).await?;

        let session = AuthSession::new(user.user_id, self.config.session_ttl_chrono());
        self.session_repo.create(&session).await?;

        let token = sign_session_token(&session.session_id, &self.config.session_secret);

        tracing::info!(
            user_id = %user.user_id,
            role = %user.user_role,
            new_user = is_new_user,
            "User signed in"
        );

        Ok(SignInOutput {
            session_token: token,
            user_id: user.user_id,
            user_role: user.user_role,
            is_new_user,
        })
    }

    async fn find_or_create(
        &self,
        email: Email,
        name: Option<String>,
    ) -> IdentityResult<(User, bool)> {
        if let Some(user) = self.user_repo.find_by_email(&email).await? {
            return Ok((user, false));
        }

        let user = User::new(email.clone(), name);
        match self.user_repo.create(&user).await {
            Ok(()) => Ok((user, true)),
            // Two first sign-ins raced; the other one created the row.
            Err(IdentityError::Database(e)) if is_unique_violation(&e) => {
                let existing = self
                    .user_repo
                    .find_by_email(&email)
                    .await?
                    .ok_or(IdentityError::UserNotFound)?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }
}
