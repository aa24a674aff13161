//! User Entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_object::{email::Email, user_role::UserRole};

/// A registered learner or administrator.
///
/// Course ownership and favorites belong to the academy context and are not
/// loaded here.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub user_role: UserRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user on first sign-in
    pub fn new(email: Email, name: Option<String>) -> Self {
        let now = Utc::now();

        Self {
            user_id: UserId::new(),
            email,
            name,
            user_role: UserRole::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record successful login, refreshing the display name from the provider
    pub fn record_login(&mut self, name: Option<String>) {
        let now = Utc::now();
        if name.is_some() {
            self.name = name;
        }
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Update user role
    pub fn set_role(&mut self, role: UserRole) {
        self.user_role = role;
        self.updated_at = Utc::now();
    }
}
