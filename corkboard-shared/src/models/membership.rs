/// Membership models for the board / list / card lattice
///
/// Three N-N join tables grant overlapping, independently revocable access
/// to the same resource tree:
///
/// - **BoardMembership**: baseline visibility and edit rights on a board
///   and everything under it.
/// - **ListMembership** / **CardMembership**: narrow-scope grants that
///   intentionally bypass board membership; a user can be invited to a
///   single list or card without ever becoming a board member.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('editor', 'viewer');
///
/// CREATE TABLE board_memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role membership_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (board_id, user_id)
/// );
/// -- list_memberships / card_memberships add can_comment BOOLEAN NULL
/// ```
///
/// # Role normalization
///
/// `can_comment` only means something for viewers (editors can always
/// comment). Persisting goes through a two-tier rule merge: a SHARED rule
/// (force `can_comment` to null) overlaid by a ROLE rule (editor keeps
/// null; viewer defaults unset to false). The merge is idempotent; see
/// [`normalize_can_comment`]. Any new role must define both tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role granted by a membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Can edit the resource (and always comment)
    Editor,

    /// Read-only, optionally allowed to comment
    Viewer,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Editor => "editor",
            MembershipRole::Viewer => "viewer",
        }
    }
}

/// Error type for membership mutations
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// The (resource, user) pair already exists
    #[error("User is already a member")]
    AlreadyMember,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The canonical SHARED + ROLE rule merge for `can_comment`
///
/// SHARED tier: `can_comment` is set to null regardless of role.
/// ROLE tier overrides:
/// - editor: keep null (editors can already comment)
/// - viewer: default an unset value to `false`, keep an explicit value
///
/// Applying the merge to already-normalized values yields the same result.
pub fn normalize_can_comment(role: MembershipRole, can_comment: Option<bool>) -> Option<bool> {
    match role {
        MembershipRole::Editor => None,
        MembershipRole::Viewer => Some(can_comment.unwrap_or(false)),
    }
}

/// Direct grant of a role on a board
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoardMembership {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub created_at: DateTime<Utc>,
}

/// Narrow-scope grant on a single list, bypassing board membership
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ListMembership {
    pub id: Uuid,
    pub list_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub can_comment: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Narrow-scope grant on a single card, bypassing board membership
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardMembership {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub can_comment: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Maps a unique-constraint violation to `AlreadyMember`
///
/// Raw constraint errors must never leak to the client.
fn map_unique_violation(err: sqlx::Error) -> MembershipError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return MembershipError::AlreadyMember;
        }
    }
    MembershipError::Database(err)
}

impl BoardMembership {
    pub async fn find_by_board_and_user(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardMembership>(
            "SELECT * FROM board_memberships WHERE board_id = $1 AND user_id = $2",
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardMembership>(
            "SELECT * FROM board_memberships WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn get_by_board_ids(
        pool: &PgPool,
        board_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardMembership>(
            "SELECT * FROM board_memberships WHERE board_id = ANY($1) ORDER BY id",
        )
        .bind(board_ids)
        .fetch_all(pool)
        .await
    }
}

impl ListMembership {
    /// Creates a grant; `can_comment` must already be normalized
    pub async fn create(
        pool: &PgPool,
        list_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
        can_comment: Option<bool>,
    ) -> Result<Self, MembershipError> {
        sqlx::query_as::<_, ListMembership>(
            r#"
            INSERT INTO list_memberships (list_id, user_id, role, can_comment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .bind(role)
        .bind(can_comment)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ListMembership>("SELECT * FROM list_memberships WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ListMembership>(
            "SELECT * FROM list_memberships WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_one(
        pool: &PgPool,
        id: Uuid,
        role: MembershipRole,
        can_comment: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ListMembership>(
            r#"
            UPDATE list_memberships
            SET role = $2, can_comment = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(can_comment)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_one(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ListMembership>(
            "DELETE FROM list_memberships WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

impl CardMembership {
    /// Creates a grant; `can_comment` must already be normalized
    pub async fn create(
        pool: &PgPool,
        card_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
        can_comment: Option<bool>,
    ) -> Result<Self, MembershipError> {
        sqlx::query_as::<_, CardMembership>(
            r#"
            INSERT INTO card_memberships (card_id, user_id, role, can_comment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(role)
        .bind(can_comment)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardMembership>("SELECT * FROM card_memberships WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardMembership>(
            "SELECT * FROM card_memberships WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_one(
        pool: &PgPool,
        id: Uuid,
        role: MembershipRole,
        can_comment: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardMembership>(
            r#"
            UPDATE card_memberships
            SET role = $2, can_comment = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(can_comment)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_one(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardMembership>(
            "DELETE FROM card_memberships WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_forces_null() {
        assert_eq!(normalize_can_comment(MembershipRole::Editor, None), None);
        assert_eq!(
            normalize_can_comment(MembershipRole::Editor, Some(true)),
            None
        );
        assert_eq!(
            normalize_can_comment(MembershipRole::Editor, Some(false)),
            None
        );
    }

    #[test]
    fn test_viewer_defaults_to_false() {
        assert_eq!(
            normalize_can_comment(MembershipRole::Viewer, None),
            Some(false)
        );
        assert_eq!(
            normalize_can_comment(MembershipRole::Viewer, Some(true)),
            Some(true)
        );
        assert_eq!(
            normalize_can_comment(MembershipRole::Viewer, Some(false)),
            Some(false)
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for role in [MembershipRole::Editor, MembershipRole::Viewer] {
            for value in [None, Some(true), Some(false)] {
                let once = normalize_can_comment(role, value);
                let twice = normalize_can_comment(role, once);
                assert_eq!(once, twice, "role {:?} value {:?}", role, value);
            }
        }
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(MembershipRole::Editor.as_str(), "editor");
        assert_eq!(MembershipRole::Viewer.as_str(), "viewer");
    }
}
