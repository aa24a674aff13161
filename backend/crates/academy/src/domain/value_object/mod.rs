//! Value Object Module

pub mod access;
pub mod learner_role;
pub mod localized_text;
pub mod money;
