/// List model
///
/// Lists come in two kinds: finite lists (ordinary Kanban columns) and the
/// infinite pseudo-lists (archive, trash) that accumulate cards forever.
/// Public resolution only ever exposes finite lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "list_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// Ordinary column, subject to normal visibility
    Kanban,

    /// Infinite archive pseudo-list
    Archive,

    /// Infinite trash pseudo-list
    Trash,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,

    #[serde(rename = "type")]
    pub list_type: ListType,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    /// Whether this is an ordinary list, as opposed to archive/trash
    pub fn is_finite(&self) -> bool {
        matches!(self.list_type, ListType::Kanban)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn get_by_board_id(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>("SELECT * FROM lists WHERE board_id = $1 ORDER BY id")
            .bind(board_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(list_type: ListType) -> List {
        List {
            id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            name: "a list".to_string(),
            list_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_finite() {
        assert!(list_of(ListType::Kanban).is_finite());
        assert!(!list_of(ListType::Archive).is_finite());
        assert!(!list_of(ListType::Trash).is_finite());
    }
}
