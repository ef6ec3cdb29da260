/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'regular');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     name VARCHAR(128) NOT NULL,
///     username CITEXT UNIQUE,
///     role user_role NOT NULL DEFAULT 'regular',
///     password_hash VARCHAR(255) NOT NULL,
///     password_changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     api_key_hash VARCHAR(64),
///     language VARCHAR(16),
///     deactivated_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Invariant
///
/// Any access token issued before `password_changed_at` is void. The
/// comparison is re-evaluated on every request, never cached, so a password
/// change revokes every outstanding token immediately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Platform-wide user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Can additionally see all shared projects
    Admin,

    /// Ordinary account
    Regular,
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The
/// optional `api_key_hash` enables the programmatic trust path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Display name
    pub name: String,

    /// Unique handle, if the user picked one
    pub username: Option<String>,

    /// Platform role
    pub role: UserRole,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the password was last changed
    ///
    /// Access tokens issued before this moment are rejected.
    pub password_changed_at: DateTime<Utc>,

    /// SHA-256 hash of the user's API key, if one was issued
    #[serde(skip_serializing)]
    pub api_key_hash: Option<String>,

    /// Preferred UI language (e.g. "en-US")
    pub language: Option<String>,

    /// Set when the account is deactivated; deactivated users never resolve
    pub deactivated_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a token issued at `issued_at` predates the last password
    /// change and must be rejected
    pub fn token_is_stale(&self, issued_at: DateTime<Utc>) -> bool {
        self.password_changed_at > issued_at
    }

    /// Finds an active (non-deactivated) user by id
    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE id = $1 AND deactivated_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an active user by email
    pub async fn find_active_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE email = $1 AND deactivated_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Finds an active user by API key hash
    ///
    /// The simpler trust path for programmatic clients: no session, no
    /// expiry, no password-change check.
    pub async fn find_active_by_api_key_hash(
        pool: &PgPool,
        api_key_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE api_key_hash = $1 AND deactivated_at IS NULL
            "#,
        )
        .bind(api_key_hash)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by id regardless of deactivation (admin surfaces)
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates the password hash and bumps `password_changed_at`
    ///
    /// Bumping the timestamp is what voids all previously issued tokens.
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_user(password_changed_at: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            username: None,
            role: UserRole::Regular,
            password_hash: "$argon2id$stub".to_string(),
            password_changed_at,
            api_key_hash: None,
            language: None,
            deactivated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_is_stale() {
        let changed_at = Utc::now();
        let user = test_user(changed_at);

        // Issued before the change: stale
        assert!(user.token_is_stale(changed_at - Duration::seconds(1)));

        // Issued at or after the change: fine
        assert!(!user.token_is_stale(changed_at));
        assert!(!user.token_is_stale(changed_at + Duration::seconds(1)));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = test_user(Utc::now());
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert!(json.get("apiKeyHash").is_none());
        assert!(json.get("passwordChangedAt").is_some());
    }
}
