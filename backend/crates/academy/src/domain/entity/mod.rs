//! Entity Module

pub mod activity;
pub mod course;
pub mod learner;
pub mod lesson;
pub mod order;
pub mod progress;
pub mod promo_code;
