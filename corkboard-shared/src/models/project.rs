/// Project model and the project-manager grant
///
/// Project managers sit at the top of the visibility lattice: they see
/// everything under the project and are the only actors allowed to mint
/// public access tokens for its boards, lists, and cards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,

    /// Shared projects are visible to all admins
    pub is_shared: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project-manager grant (N-N join between users and projects)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManager {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Shared projects, excluding the given ids (already fully visible)
    pub async fn get_shared_except(
        pool: &PgPool,
        except_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE is_shared = TRUE AND id != ALL($1)
            ORDER BY id
            "#,
        )
        .bind(except_ids)
        .fetch_all(pool)
        .await
    }
}

impl ProjectManager {
    /// Whether the user manages the given project
    pub async fn exists(
        pool: &PgPool,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM project_managers
            WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }

    /// Ids of all projects the user manages
    pub async fn get_project_ids_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT project_id FROM project_managers WHERE user_id = $1 ORDER BY project_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
