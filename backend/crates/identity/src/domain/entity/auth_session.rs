//! Auth Session Entity
//!
//! Server-side session referenced by the signed cookie token.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub user_id: UserId,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            user_id,
            expires_at_ms: (now + ttl).timestamp_millis(),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    pub fn remaining_ms(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        (self.expires_at_ms - now_ms).max(0)
    }
}
