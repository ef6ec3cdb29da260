/// Task-list and task models
///
/// Tasks live in task lists, which live on cards. `Task::is_completed` is
/// the single field the anonymous public write path may touch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: Uuid,
    pub card_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub task_list_id: Uuid,
    pub name: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskList {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskList>("SELECT * FROM task_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_card_ids(
        pool: &PgPool,
        card_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskList>(
            "SELECT * FROM task_lists WHERE card_id = ANY($1) ORDER BY id",
        )
        .bind(card_ids)
        .fetch_all(pool)
        .await
    }
}

impl Task {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_task_list_ids(
        pool: &PgPool,
        task_list_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE task_list_id = ANY($1) ORDER BY id",
        )
        .bind(task_list_ids)
        .fetch_all(pool)
        .await
    }

    /// Updates only the completion flag
    pub async fn set_completed(
        pool: &PgPool,
        id: Uuid,
        is_completed: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET is_completed = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_completed)
        .fetch_optional(pool)
        .await
    }
}
