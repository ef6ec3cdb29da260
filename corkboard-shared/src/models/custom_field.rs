/// Custom-field models
///
/// A group attaches either to a board (applies to all its cards) or to a
/// single card; fields belong to a group and values land on cards. Only the
/// read surface needed by public resolution lives here; schema management
/// is out of scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldGroup {
    pub id: Uuid,
    pub board_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: Uuid,
    pub custom_field_group_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    pub id: Uuid,
    pub card_id: Uuid,
    pub custom_field_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomFieldGroup {
    pub async fn get_by_board_id(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomFieldGroup>(
            "SELECT * FROM custom_field_groups WHERE board_id = $1 ORDER BY id",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn get_by_card_ids(
        pool: &PgPool,
        card_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomFieldGroup>(
            "SELECT * FROM custom_field_groups WHERE card_id = ANY($1) ORDER BY id",
        )
        .bind(card_ids)
        .fetch_all(pool)
        .await
    }
}

impl CustomField {
    pub async fn get_by_group_ids(
        pool: &PgPool,
        group_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomField>(
            "SELECT * FROM custom_fields WHERE custom_field_group_id = ANY($1) ORDER BY id",
        )
        .bind(group_ids)
        .fetch_all(pool)
        .await
    }
}

impl CustomFieldValue {
    pub async fn get_by_card_ids(
        pool: &PgPool,
        card_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomFieldValue>(
            "SELECT * FROM custom_field_values WHERE card_id = ANY($1) ORDER BY id",
        )
        .bind(card_ids)
        .fetch_all(pool)
        .await
    }
}
