use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    #[display("user")]
    User = 0,
    #[display("admin")]
    Admin = 1,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Decode the stored role. Unknown ids are treated as plain users so a bad
    /// row can never escalate privileges.
    pub fn from_id(id: i16) -> Self {
        match id {
            1 => UserRole::Admin,
            0 => UserRole::User,
            other => {
                tracing::error!(role_id = other, "Invalid UserRole id, treating as user");
                UserRole::User
            }
        }
    }
}
