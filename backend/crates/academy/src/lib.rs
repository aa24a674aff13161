//! Academy Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Courses, learners, orders, promo codes, progress; repository
//!   traits and the payment/storage ports
//! - `application/` - Use cases (access, checkout, fulfillment, media, files,
//!   catalog, promo validation, progress, favorites, admin)
//! - `infra/` - PostgreSQL repository, Stripe gateway, filesystem blob store
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Entitlement Model
//! - A learner may open a course iff their stored role is `admin` or the
//!   course is in their owned set. Every gated endpoint asks
//!   [`application::CheckAccessUseCase`] and nothing caches the answer.
//! - The owned set only grows through a verified payment webhook. Fulfillment
//!   is idempotent per payment session: the order upsert and the ownership
//!   insert are single conditional statements, so concurrent redeliveries
//!   grant the course once.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::AcademyConfig;
pub use error::{AcademyError, AcademyResult};
pub use infra::blob_store::FsBlobStore;
pub use infra::postgres::PgAcademyRepository;
pub use infra::stripe::{StripeConfig, StripeGateway};
pub use presentation::router::{academy_router, academy_router_generic};

#[cfg(test)]
mod tests;
