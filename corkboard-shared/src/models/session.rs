/// Session model and database operations
///
/// A session binds an access-token string to a user and, optionally, to an
/// httpOnly companion secret that ties the token to the browser that
/// obtained it. Sessions are soft-deleted on logout or invalidation and
/// never hard-deleted, preserving the audit trail. One user may hold many
/// concurrent sessions (multi-device).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     access_token TEXT NOT NULL UNIQUE,
///     http_only_token VARCHAR(64),
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Session model binding an access token to a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// The signed access-token string (unique)
    pub access_token: String,

    /// httpOnly companion secret, if the session was created by a browser
    ///
    /// When present, non-socket requests must echo it back in the
    /// `httpOnlyToken` cookie.
    #[serde(skip_serializing)]
    pub http_only_token: Option<String>,

    /// Soft-revocation marker; set on logout, never cleared
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for a freshly signed access token
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        access_token: &str,
        http_only_token: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, access_token, http_only_token)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(http_only_token)
        .fetch_one(pool)
        .await
    }

    /// Finds the active (not soft-deleted) session for a token string
    pub async fn find_active_by_access_token(
        pool: &PgPool,
        access_token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE access_token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(access_token)
        .fetch_optional(pool)
        .await
    }

    /// Soft-revokes a session
    ///
    /// Idempotent: re-invalidating an already-deleted session keeps the
    /// original `deleted_at`.
    pub async fn invalidate(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Soft-revokes every active session of a user
    ///
    /// Used on password change so other devices are logged out too.
    /// Returns the access tokens of the sessions that were revoked, so the
    /// caller can push forced-logout events to their topics.
    pub async fn invalidate_all_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND deleted_at IS NULL
            RETURNING access_token
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(token,)| token).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_only_token_not_serialized() {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_token: "token".to_string(),
            http_only_token: Some("secret".to_string()),
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("httpOnlyToken").is_none());
        assert!(json.get("accessToken").is_some());
    }
}
