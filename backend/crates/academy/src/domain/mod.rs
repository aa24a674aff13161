//! Domain Layer
//!
//! Entities, value objects, repository traits, ports for the payment gateway
//! and blob storage, and pure domain services.

pub mod entity;
pub mod payment;
pub mod repository;
pub mod services;
pub mod storage;
pub mod value_object;

// Re-exports
pub use entity::{
    course::Course,
    learner::Learner,
    lesson::{Lesson, LessonFile, LessonVideo},
    order::{Order, OrderStatus},
    promo_code::PromoCode,
};
pub use payment::{PaymentEvent, PaymentGateway};
pub use repository::{
    AcademyRepository, ActivityRepository, CourseRepository, LearnerRepository, OrderRepository,
    ProgressRepository, PromoCodeRepository,
};
pub use storage::BlobStore;
