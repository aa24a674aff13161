//! Learner role as stored on the `users` row

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerRole {
    #[default]
    User,
    Admin,
}

impl LearnerRole {
    /// Unknown ids never grant admin rights
    pub fn from_id(id: i16) -> Self {
        match id {
            1 => LearnerRole::Admin,
            _ => LearnerRole::User,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            LearnerRole::User => "user",
            LearnerRole::Admin => "admin",
        }
    }

    pub const fn is_admin(&self) -> bool {
        matches!(self, LearnerRole::Admin)
    }
}
