/// Accessible-projects index
///
/// # Endpoint
///
/// ```text
/// GET /api/projects
/// ```
///
/// Lists every project the caller can see: managed projects, projects
/// owning a board reachable through any membership source, and (for
/// admins) all shared projects. The union is deduplicated once per
/// request before the projects themselves are fetched.

use crate::{app::AppState, error::ApiResult, middleware::current_user::CurrentUser};
use axum::{extract::State, Json};
use corkboard_shared::auth::authorization;
use corkboard_shared::models::project::Project;
use serde::Serialize;
use uuid::Uuid;

/// Projects index response
#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub items: Vec<Project>,
}

/// Projects index handler
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<ProjectsResponse>> {
    let project_ids: Vec<Uuid> =
        authorization::accessible_project_ids(&state.db, &current.user)
            .await?
            .into_iter()
            .collect();

    let items = if project_ids.is_empty() {
        Vec::new()
    } else {
        Project::get_by_ids(&state.db, &project_ids).await?
    };

    Ok(Json(ProjectsResponse { items }))
}
