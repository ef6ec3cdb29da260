/// Public-access token model
///
/// An opaque, unguessable credential granting anonymous read access to
/// exactly one board, list, or card. The token string is a random UUID, so
/// it is URL-safe and carries no structure.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE public_access_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     token VARCHAR(64) NOT NULL UNIQUE,
///     board_id UUID REFERENCES boards(id) ON DELETE CASCADE,
///     list_id UUID REFERENCES lists(id) ON DELETE CASCADE,
///     card_id UUID REFERENCES cards(id) ON DELETE CASCADE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Exactly one of board_id/list_id/card_id is set. At-most-one active token
/// per scope is enforced by a pre-check before creation, not a database
/// constraint; concurrent duplicate requests can race (documented gap;
/// duplicate tokens are last-writer-wins tolerable, not a security hole).
///
/// # State machine
///
/// `Active` (default) → `Expired` (derived from `expires_at`, not stored)
/// or `Inactive` (`is_active = false`, administratively toggled). Terminal
/// by hard deletion. A token whose `expires_at` equals the current instant
/// is already expired: validity is strict `now < expires_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// The single resource a token grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Board(Uuid),
    List(Uuid),
    Card(Uuid),
}

/// Derived token status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Inactive,
    Expired,
}

/// Error type for the public-access token subsystem
#[derive(Debug, thiserror::Error)]
pub enum PublicTokenError {
    #[error("Public token not found")]
    TokenNotFound,

    #[error("Public token is inactive")]
    TokenInactive,

    #[error("Public token has expired")]
    TokenExpired,

    #[error("Public token already exists for this resource")]
    TokenAlreadyExists,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccessToken {
    pub id: Uuid,

    /// Opaque random token string (unique)
    pub token: String,

    pub board_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub card_id: Option<Uuid>,

    /// Administrative kill switch, default true
    pub is_active: bool,

    /// Optional expiry; `None` means the token never expires
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicAccessToken {
    /// The scope this token grants, derived from whichever FK is set
    pub fn scope(&self) -> Option<TokenScope> {
        match (self.board_id, self.list_id, self.card_id) {
            (Some(id), None, None) => Some(TokenScope::Board(id)),
            (None, Some(id), None) => Some(TokenScope::List(id)),
            (None, None, Some(id)) => Some(TokenScope::Card(id)),
            _ => None,
        }
    }

    /// Derived status at `now`
    ///
    /// Inactive takes precedence over Expired, matching the order the
    /// checks are surfaced to clients. Validity at the expiry boundary is
    /// strict: `expires_at == now` is already Expired.
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if !self.is_active {
            return TokenStatus::Inactive;
        }

        match self.expires_at {
            Some(expires_at) if now >= expires_at => TokenStatus::Expired,
            _ => TokenStatus::Active,
        }
    }

    /// Rejects any token that is not currently usable
    ///
    /// The three failure states map to distinct errors so a client can
    /// show "bad link" vs. "link disabled" vs. "link expired".
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), PublicTokenError> {
        match self.status(now) {
            TokenStatus::Active => Ok(()),
            TokenStatus::Inactive => Err(PublicTokenError::TokenInactive),
            TokenStatus::Expired => Err(PublicTokenError::TokenExpired),
        }
    }

    /// Creates a token for a scope; the token string is a fresh UUID
    ///
    /// Callers must run the duplicate-scope pre-check first; this insert
    /// alone only guards uniqueness of the token string itself.
    pub async fn create(
        pool: &PgPool,
        scope: TokenScope,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, sqlx::Error> {
        let token = Uuid::new_v4().to_string();

        let (board_id, list_id, card_id) = match scope {
            TokenScope::Board(id) => (Some(id), None, None),
            TokenScope::List(id) => (None, Some(id), None),
            TokenScope::Card(id) => (None, None, Some(id)),
        };

        sqlx::query_as::<_, PublicAccessToken>(
            r#"
            INSERT INTO public_access_tokens (token, board_id, list_id, card_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(board_id)
        .bind(list_id)
        .bind(card_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PublicAccessToken>(
            "SELECT * FROM public_access_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Finds the token for a scope, if any (the duplicate pre-check)
    pub async fn find_by_scope(
        pool: &PgPool,
        scope: TokenScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (column, id) = match scope {
            TokenScope::Board(id) => ("board_id", id),
            TokenScope::List(id) => ("list_id", id),
            TokenScope::Card(id) => ("card_id", id),
        };

        let query = format!("SELECT * FROM public_access_tokens WHERE {} = $1", column);

        sqlx::query_as::<_, PublicAccessToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-deletes the token for a scope
    pub async fn delete_by_scope(
        pool: &PgPool,
        scope: TokenScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (column, id) = match scope {
            TokenScope::Board(id) => ("board_id", id),
            TokenScope::List(id) => ("list_id", id),
            TokenScope::Card(id) => ("card_id", id),
        };

        let query = format!(
            "DELETE FROM public_access_tokens WHERE {} = $1 RETURNING *",
            column
        );

        sqlx::query_as::<_, PublicAccessToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_row(
        is_active: bool,
        expires_at: Option<DateTime<Utc>>,
        scope: TokenScope,
    ) -> PublicAccessToken {
        let (board_id, list_id, card_id) = match scope {
            TokenScope::Board(id) => (Some(id), None, None),
            TokenScope::List(id) => (None, Some(id), None),
            TokenScope::Card(id) => (None, None, Some(id)),
        };

        PublicAccessToken {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            board_id,
            list_id,
            card_id,
            is_active,
            expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_scope_round_trip() {
        let board_id = Uuid::new_v4();
        let row = token_row(true, None, TokenScope::Board(board_id));
        assert_eq!(row.scope(), Some(TokenScope::Board(board_id)));

        let list_id = Uuid::new_v4();
        let row = token_row(true, None, TokenScope::List(list_id));
        assert_eq!(row.scope(), Some(TokenScope::List(list_id)));
    }

    #[test]
    fn test_status_active() {
        let now = Utc::now();
        let row = token_row(true, None, TokenScope::Board(Uuid::new_v4()));
        assert_eq!(row.status(now), TokenStatus::Active);
        assert!(row.ensure_usable(now).is_ok());
    }

    #[test]
    fn test_status_inactive_wins_over_expired() {
        let now = Utc::now();
        let row = token_row(
            false,
            Some(now - Duration::hours(1)),
            TokenScope::Board(Uuid::new_v4()),
        );
        assert_eq!(row.status(now), TokenStatus::Inactive);
        assert!(matches!(
            row.ensure_usable(now),
            Err(PublicTokenError::TokenInactive)
        ));
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let now = Utc::now();
        let scope = TokenScope::Card(Uuid::new_v4());

        // expires_at exactly now: already expired
        let row = token_row(true, Some(now), scope);
        assert_eq!(row.status(now), TokenStatus::Expired);

        // one second in the future: still active
        let row = token_row(true, Some(now + Duration::seconds(1)), scope);
        assert_eq!(row.status(now), TokenStatus::Active);

        // one second in the past: expired
        let row = token_row(true, Some(now - Duration::seconds(1)), scope);
        assert_eq!(row.status(now), TokenStatus::Expired);
        assert!(matches!(
            row.ensure_usable(now),
            Err(PublicTokenError::TokenExpired)
        ));
    }
}
