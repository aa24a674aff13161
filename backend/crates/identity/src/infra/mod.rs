//! Infrastructure Layer
//!
//! PostgreSQL persistence and the HTTP OAuth provider client.

pub mod oauth;
pub mod postgres;

pub use oauth::{HttpOAuthProvider, OAuthClientConfig};
pub use postgres::PgIdentityRepository;
