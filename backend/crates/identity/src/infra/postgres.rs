//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::IdentityResult;

/// PostgreSQL-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> IdentityResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired auth sessions");

        Ok(deleted)
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgIdentityRepository {
    async fn create(&self, user: &User) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email,
                name,
                user_role,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(user.user_role.id())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, email, name, user_role, last_login_at, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, email, name, user_role, last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn update(&self, user: &User) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                user_role = $3,
                last_login_at = $4,
                updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.name)
        .bind(user.user_role.id())
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Auth Session Repository Implementation
// ============================================================================

impl AuthSessionRepository for PgIdentityRepository {
    async fn create(&self, session: &AuthSession) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (session_id, user_id, expires_at_ms, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id.as_uuid())
        .bind(session.expires_at_ms)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> IdentityResult<Option<AuthSession>> {
        let now_ms = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, AuthSessionRow>(
            r#"
            SELECT session_id, user_id, expires_at_ms, created_at
            FROM auth_sessions
            WHERE session_id = $1 AND expires_at_ms > $2
            "#,
        )
        .bind(session_id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthSessionRow::into_session))
    }

    async fn delete(&self, session_id: Uuid) -> IdentityResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> IdentityResult<u64> {
        self.cleanup_expired().await
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    name: Option<String>,
    user_role: i16,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            name: self.name,
            user_role: UserRole::from_id(self.user_role),
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthSessionRow {
    session_id: Uuid,
    user_id: Uuid,
    expires_at_ms: i64,
    created_at: DateTime<Utc>,
}

impl AuthSessionRow {
    fn into_session(self) -> AuthSession {
        AuthSession {
            session_id: self.session_id,
            user_id: UserId::from_uuid(self.user_id),
            expires_at_ms: self.expires_at_ms,
            created_at: self.created_at,
        }
    }
}
