//! Application Layer
//!
//! Use cases and application services.

pub mod catalog;
pub mod check_access;
pub mod config;
pub mod download_file;
pub mod favorites;
pub mod fulfill_payment;
pub mod initiate_checkout;
pub mod manage_course;
pub mod media_access;
pub mod track_progress;
pub mod validate_promo;

// Re-exports
pub use catalog::{CatalogUseCase, LessonView};
pub use check_access::{CheckAccessUseCase, Entitled};
pub use config::AcademyConfig;
pub use download_file::{DownloadFileUseCase, FileDownload};
pub use favorites::ToggleFavoriteUseCase;
pub use fulfill_payment::{FulfillPaymentUseCase, WebhookOutcome};
pub use initiate_checkout::{CheckoutInput, CheckoutOutput, InitiateCheckoutUseCase};
pub use manage_course::{CreatePromoInput, ManageCourseUseCase};
pub use media_access::{MediaAccessUseCase, MediaToken};
pub use track_progress::{CourseProgress, TrackProgressUseCase};
pub use validate_promo::{PromoValidation, ValidatePromoUseCase};
