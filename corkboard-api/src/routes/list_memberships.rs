/// List membership endpoints
///
/// Narrow-scope grants: inviting a user to a single list without making
/// them a board member. The gate is board-editor standing for the *actor*;
/// the *target* user may be a complete outsider; that is the point.
///
/// # Endpoints
///
/// - `POST /api/lists/:listId/memberships`
/// - `PATCH /api/list-memberships/:id`
/// - `DELETE /api/list-memberships/:id`
///
/// Every mutation broadcasts to the owning board's topic and enqueues
/// webhook delivery with the project/board/list context embedded.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::current_user::CurrentUser,
};
use axum::{
    extract::{Path, State},
    Json,
};
use corkboard_shared::{
    auth::authorization::{self, BoardContext},
    models::{
        list::List,
        membership::{normalize_can_comment, ListMembership, MembershipRole},
        user::User,
        webhook::{Webhook, WebhookEvent},
    },
    realtime::board_topic,
    webhooks::{send_webhooks, WebhookActor},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Create request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// User to invite; need not be a board member
    pub user_id: Uuid,

    pub role: MembershipRole,

    /// Only meaningful for viewers; normalized before persisting
    pub can_comment: Option<bool>,
}

/// Update request; absent fields keep their current values
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub role: Option<MembershipRole>,
    pub can_comment: Option<bool>,
}

/// Single-item response envelope
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: ListMembership,
}

/// The `{item, included}` payload broadcast and delivered to webhooks
fn event_data(membership: &ListMembership, list: &List, context: &BoardContext) -> Value {
    json!({
        "item": membership,
        "included": {
            "projects": [context.project],
            "boards": [context.board],
            "lists": [list],
        },
    })
}

async fn notify(
    state: &AppState,
    event: WebhookEvent,
    data: Value,
    prev_data: Option<Value>,
    actor: WebhookActor,
    board_id: Uuid,
) {
    if let Err(e) = state
        .broadcaster
        .publish(&board_topic(board_id), event.as_str(), data["item"].clone())
        .await
    {
        tracing::warn!("Failed to broadcast {}: {}", event.as_str(), e);
    }

    match Webhook::get_all(&state.db).await {
        Ok(webhooks) => send_webhooks(webhooks, event, data, prev_data, actor),
        Err(e) => tracing::warn!("Failed to load webhooks: {}", e),
    }
}

/// Create handler
///
/// # Errors
///
/// - `404 Not Found`: List missing, actor is not a board member, or the
///   target user does not exist
/// - `403 Forbidden`: Actor is only a viewer
/// - `409 Conflict`: The user is already a member of this list
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(list_id): Path<Uuid>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let (list, context) =
        authorization::require_list_editor(&state.db, &current.user, list_id).await?;

    User::find_active_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let can_comment = normalize_can_comment(req.role, req.can_comment);

    let membership =
        ListMembership::create(&state.db, list_id, req.user_id, req.role, can_comment).await?;

    let data = event_data(&membership, &list, &context);
    notify(
        &state,
        WebhookEvent::ListMembershipCreate,
        data,
        None,
        WebhookActor::from_user(&current.user),
        context.board.id,
    )
    .await;

    Ok(Json(ItemResponse { item: membership }))
}

/// Update handler
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let existing = ListMembership::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List membership not found".to_string()))?;

    let (list, context) =
        authorization::require_list_editor(&state.db, &current.user, existing.list_id).await?;

    let role = req.role.unwrap_or(existing.role);
    let can_comment = normalize_can_comment(role, req.can_comment.or(existing.can_comment));

    let prev_data = Some(event_data(&existing, &list, &context));

    let membership = ListMembership::update_one(&state.db, id, role, can_comment)
        .await?
        .ok_or_else(|| ApiError::NotFound("List membership not found".to_string()))?;

    let data = event_data(&membership, &list, &context);
    notify(
        &state,
        WebhookEvent::ListMembershipUpdate,
        data,
        prev_data,
        WebhookActor::from_user(&current.user),
        context.board.id,
    )
    .await;

    Ok(Json(ItemResponse { item: membership }))
}

/// Delete handler
pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    let existing = ListMembership::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List membership not found".to_string()))?;

    let (list, context) =
        authorization::require_list_editor(&state.db, &current.user, existing.list_id).await?;

    let membership = ListMembership::delete_one(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List membership not found".to_string()))?;

    let data = event_data(&membership, &list, &context);
    notify(
        &state,
        WebhookEvent::ListMembershipDelete,
        data,
        None,
        WebhookActor::from_user(&current.user),
        context.board.id,
    )
    .await;

    Ok(Json(ItemResponse { item: membership }))
}
