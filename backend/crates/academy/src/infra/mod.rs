//! Infrastructure Layer
//!
//! PostgreSQL persistence, the Stripe payment gateway and filesystem blob
//! storage.

pub mod blob_store;
pub mod postgres;
pub mod stripe;

pub use blob_store::FsBlobStore;
pub use postgres::PgAcademyRepository;
pub use stripe::{StripeConfig, StripeGateway};
