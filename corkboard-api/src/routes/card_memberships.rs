/// Card membership endpoints
///
/// The card-scoped twin of the list membership routes: a narrow grant on a
/// single card, bypassing board membership. Gate and normalization rules
/// are identical.
///
/// # Endpoints
///
/// - `POST /api/cards/:cardId/memberships`
/// - `PATCH /api/card-memberships/:id`
/// - `DELETE /api/card-memberships/:id`

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
        card::Card,
        membership::{normalize_can_comment, CardMembership, MembershipRole},
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
    pub user_id: Uuid,
    pub role: MembershipRole,
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
    pub item: CardMembership,
}

fn event_data(membership: &CardMembership, card: &Card, context: &BoardContext) -> Value {
    json!({
        "item": membership,
        "included": {
            "projects": [context.project],
            "boards": [context.board],
            "cards": [card],
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
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(card_id): Path<Uuid>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let (card, context) =
        authorization::require_card_editor(&state.db, &current.user, card_id).await?;

    User::find_active_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let can_comment = normalize_can_comment(req.role, req.can_comment);

    let membership =
        CardMembership::create(&state.db, card_id, req.user_id, req.role, can_comment).await?;

    let data = event_data(&membership, &card, &context);
    notify(
        &state,
        WebhookEvent::CardMembershipCreate,
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
    let existing = CardMembership::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card membership not found".to_string()))?;

    let (card, context) =
        authorization::require_card_editor(&state.db, &current.user, existing.card_id).await?;

    let role = req.role.unwrap_or(existing.role);
    let can_comment = normalize_can_comment(role, req.can_comment.or(existing.can_comment));

    let prev_data = Some(event_data(&existing, &card, &context));

    let membership = CardMembership::update_one(&state.db, id, role, can_comment)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card membership not found".to_string()))?;

    let data = event_data(&membership, &card, &context);
    notify(
        &state,
        WebhookEvent::CardMembershipUpdate,
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
    let existing = CardMembership::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card membership not found".to_string()))?;

    let (card, context) =
        authorization::require_card_editor(&state.db, &current.user, existing.card_id).await?;

    let membership = CardMembership::delete_one(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card membership not found".to_string()))?;

    let data = event_data(&membership, &card, &context);
    notify(
        &state,
        WebhookEvent::CardMembershipDelete,
        data,
        None,
        WebhookActor::from_user(&current.user),
        context.board.id,
    )
    .await;

    Ok(Json(ItemResponse { item: membership }))
}
