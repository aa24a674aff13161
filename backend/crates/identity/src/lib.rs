//! Identity Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Users, sessions, repository and provider traits
//! - `application/` - Use cases (sign in, check session, sign out)
//! - `infra/` - PostgreSQL repository, HTTP OAuth provider
//! - `presentation/` - HTTP handlers, DTOs, router, identity middleware
//!
//! ## Security Model
//! - Users sign in through an OAuth provider; only verified emails are accepted
//! - Sessions live server-side; the cookie carries `session_id.hmac`
//! - Roles are stored on the user row; a configured allow-list of emails is
//!   provisioned to `admin` at sign-in and nothing else grants admin rights
//! - The middleware only resolves *who* is calling. Whether they may see a
//!   course is decided by the academy, from fresh database reads.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::oauth::{HttpOAuthProvider, OAuthClientConfig};
pub use infra::postgres::PgIdentityRepository;
pub use presentation::middleware::{IdentityMiddlewareState, resolve_identity};
pub use presentation::router::{identity_router, identity_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
