//! Repository Traits
//!
//! Interfaces for data persistence and the external OAuth provider.
//! Implementations live in the infrastructure layer.

use kernel::id::UserId;
use uuid::Uuid;

use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::value_object::email::Email;
use crate::error::IdentityResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user. Fails with a unique violation if the email exists.
    async fn create(&self, user: &User) -> IdentityResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>>;

    /// Persist name, role and login timestamps
    async fn update(&self, user: &User) -> IdentityResult<()>;
}

/// Auth session repository trait
#[trait_variant::make(AuthSessionRepository: Send)]
pub trait LocalAuthSessionRepository {
    async fn create(&self, session: &AuthSession) -> IdentityResult<()>;

    /// Find a live (non-expired) session
    async fn find_by_id(&self, session_id: Uuid) -> IdentityResult<Option<AuthSession>>;

    async fn delete(&self, session_id: Uuid) -> IdentityResult<()>;

    /// Clean up expired sessions
    async fn cleanup_expired(&self) -> IdentityResult<u64>;
}

/// Profile returned by the OAuth provider after a successful code exchange
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}

/// External identity provider
#[trait_variant::make(OAuthProvider: Send)]
pub trait LocalOAuthProvider {
    /// URL the browser is sent to, carrying our anti-CSRF `state`
    fn authorize_url(&self, state: &str) -> IdentityResult<String>;

    /// Exchange an authorization code for the caller's verified profile
    async fn exchange_code(&self, code: &str) -> IdentityResult<OAuthProfile>;
}
