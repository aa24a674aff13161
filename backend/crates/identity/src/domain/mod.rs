//! Domain Layer
//!
//! Contains entities, value objects, and repository/provider traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{auth_session::AuthSession, user::User};
pub use repository::{AuthSessionRepository, OAuthProfile, OAuthProvider, UserRepository};
