//! Application Layer
//!
//! Use cases and application services.

pub mod check_session;
pub mod config;
pub mod session_token;
pub mod sign_in;
pub mod sign_out;

// Re-exports
pub use check_session::{CheckSessionUseCase, SessionInfoOutput};
pub use config::IdentityConfig;
pub use sign_in::{SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
