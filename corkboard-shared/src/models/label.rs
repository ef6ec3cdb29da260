/// Label and card-label models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// N-N join between cards and labels
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardLabel {
    pub id: Uuid,
    pub card_id: Uuid,
    pub label_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Label {
    pub async fn get_by_board_id(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE board_id = $1 ORDER BY id")
            .bind(board_id)
            .fetch_all(pool)
            .await
    }
}

impl CardLabel {
    pub async fn get_by_card_ids(
        pool: &PgPool,
        card_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardLabel>(
            "SELECT * FROM card_labels WHERE card_id = ANY($1) ORDER BY id",
        )
        .bind(card_ids)
        .fetch_all(pool)
        .await
    }
}
