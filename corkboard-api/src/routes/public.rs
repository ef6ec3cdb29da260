/// Anonymous access through public tokens
///
/// # Endpoints
///
/// - `GET /api/public/:token` - Resolves the token's scope into an
///   `{item, included}` envelope
/// - `PATCH /api/public/:token/tasks/:taskId` - The single anonymous
///   write: toggling a task's completion flag
///
/// The token itself is the credential; no identity is required or
/// consulted. Token state (`is_active`, `expires_at`) is re-validated on
/// every call, so revoking a token takes effect immediately, including for
/// the task update.
///
/// Infinite pseudo-lists (archive, trash) never appear in envelopes, and
/// only cards on the exposed finite lists are included.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use corkboard_shared::{
    models::{
        board::Board,
        card::Card,
        custom_field::{CustomField, CustomFieldGroup, CustomFieldValue},
        label::{CardLabel, Label},
        list::List,
        project::Project,
        public_access_token::{PublicAccessToken, PublicTokenError, TokenScope},
        task::{Task, TaskList},
        webhook::{Webhook, WebhookEvent},
    },
    realtime::board_topic,
    webhooks::{send_webhooks, WebhookActor},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Sibling records bundled with every public resolution
///
/// The plural keys are the stable wire format; clients index records by
/// type name and id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIncluded {
    pub projects: Vec<Project>,
    pub labels: Vec<Label>,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub card_labels: Vec<CardLabel>,
    pub task_lists: Vec<TaskList>,
    pub tasks: Vec<Task>,
    pub custom_field_groups: Vec<CustomFieldGroup>,
    pub custom_fields: Vec<CustomField>,
    pub custom_field_values: Vec<CustomFieldValue>,
}

/// Resolution envelope; `item` is the board, list, or card the token names
#[derive(Debug, Serialize)]
pub struct PublicEnvelope {
    pub item: Value,
    pub included: PublicIncluded,
}

/// Task update request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub is_completed: bool,
}

/// Task update response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub item: Task,
}

/// Whether a card falls inside a token's scope
///
/// Board tokens cover every card on the board; list and card tokens
/// require an exact match on the narrower id.
fn scope_contains(scope: TokenScope, card: &Card) -> bool {
    match scope {
        TokenScope::Board(board_id) => card.board_id == board_id,
        TokenScope::List(list_id) => card.list_id == list_id,
        TokenScope::Card(card_id) => card.id == card_id,
    }
}

/// Loads a usable token or fails with the matching typed error
async fn load_usable_token(
    state: &AppState,
    token: &str,
) -> Result<PublicAccessToken, PublicTokenError> {
    let record = PublicAccessToken::find_by_token(&state.db, token)
        .await?
        .ok_or(PublicTokenError::TokenNotFound)?;

    record.ensure_usable(Utc::now())?;
    Ok(record)
}

/// Gathers the `included` sidecar for a set of exposed lists and cards
///
/// Board-level custom-field groups are included only when
/// `with_board_groups` is set; narrow tokens expose card-scoped groups
/// alone.
async fn build_included(
    state: &AppState,
    board: &Board,
    lists: Vec<List>,
    cards: Vec<Card>,
    with_board_groups: bool,
) -> Result<PublicIncluded, PublicTokenError> {
    let project = Project::find_by_id(&state.db, board.project_id)
        .await?
        .ok_or(PublicTokenError::TokenNotFound)?;

    let labels = Label::get_by_board_id(&state.db, board.id).await?;

    let card_ids: Vec<Uuid> = cards.iter().map(|c| c.id).collect();

    let (card_labels, task_lists, mut custom_field_groups, custom_field_values) =
        if card_ids.is_empty() {
            (Vec::new(), Vec::new(), Vec::new(), Vec::new())
        } else {
            (
                CardLabel::get_by_card_ids(&state.db, &card_ids).await?,
                TaskList::get_by_card_ids(&state.db, &card_ids).await?,
                CustomFieldGroup::get_by_card_ids(&state.db, &card_ids).await?,
                CustomFieldValue::get_by_card_ids(&state.db, &card_ids).await?,
            )
        };

    let task_list_ids: Vec<Uuid> = task_lists.iter().map(|t| t.id).collect();
    let tasks = if task_list_ids.is_empty() {
        Vec::new()
    } else {
        Task::get_by_task_list_ids(&state.db, &task_list_ids).await?
    };

    if with_board_groups {
        custom_field_groups.extend(CustomFieldGroup::get_by_board_id(&state.db, board.id).await?);
    }

    let group_ids: Vec<Uuid> = custom_field_groups.iter().map(|g| g.id).collect();
    let custom_fields = if group_ids.is_empty() {
        Vec::new()
    } else {
        CustomField::get_by_group_ids(&state.db, &group_ids).await?
    };

    Ok(PublicIncluded {
        projects: vec![project],
        labels,
        lists,
        cards,
        card_labels,
        task_lists,
        tasks,
        custom_field_groups,
        custom_fields,
        custom_field_values,
    })
}

/// Resolution handler
///
/// # Errors
///
/// - `404 Not Found`: Unknown token, or the scoped resource is gone
/// - `403 Forbidden`: Token inactive or expired (distinct messages)
pub async fn show(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<PublicEnvelope>> {
    let record = load_usable_token(&state, &token).await?;
    let scope = record.scope().ok_or(PublicTokenError::TokenNotFound)?;

    let envelope = match scope {
        TokenScope::Board(board_id) => {
            let board = Board::find_by_id(&state.db, board_id)
                .await
                .map_err(PublicTokenError::from)?
                .ok_or(PublicTokenError::TokenNotFound)?;

            let lists: Vec<List> = List::get_by_board_id(&state.db, board.id)
                .await
                .map_err(PublicTokenError::from)?
                .into_iter()
                .filter(List::is_finite)
                .collect();

            let list_ids: Vec<Uuid> = lists.iter().map(|l| l.id).collect();
            let cards = if list_ids.is_empty() {
                Vec::new()
            } else {
                Card::get_by_list_ids(&state.db, &list_ids)
                    .await
                    .map_err(PublicTokenError::from)?
            };

            let included = build_included(&state, &board, lists, cards, true).await?;
            PublicEnvelope {
                item: json!(board),
                included,
            }
        }
        TokenScope::List(list_id) => {
            let list = List::find_by_id(&state.db, list_id)
                .await
                .map_err(PublicTokenError::from)?
                .filter(List::is_finite)
                .ok_or(PublicTokenError::TokenNotFound)?;

            let board = Board::find_by_id(&state.db, list.board_id)
                .await
                .map_err(PublicTokenError::from)?
                .ok_or(PublicTokenError::TokenNotFound)?;

            let cards = Card::get_by_list_ids(&state.db, &[list.id])
                .await
                .map_err(PublicTokenError::from)?;

            let item = json!(list);
            let included = build_included(&state, &board, vec![list], cards, false).await?;
            PublicEnvelope { item, included }
        }
        TokenScope::Card(card_id) => {
            let card = Card::find_by_id(&state.db, card_id)
                .await
                .map_err(PublicTokenError::from)?
                .ok_or(PublicTokenError::TokenNotFound)?;

            let board = Board::find_by_id(&state.db, card.board_id)
                .await
                .map_err(PublicTokenError::from)?
                .ok_or(PublicTokenError::TokenNotFound)?;

            // The card's own list rides along when it is an ordinary one
            let lists: Vec<List> = List::find_by_id(&state.db, card.list_id)
                .await
                .map_err(PublicTokenError::from)?
                .filter(List::is_finite)
                .into_iter()
                .collect();

            let item = json!(card);
            let included = build_included(&state, &board, lists, vec![card], false).await?;
            PublicEnvelope { item, included }
        }
    };

    Ok(Json(envelope))
}

/// Anonymous task update handler
///
/// Only `isCompleted` is ever applied, whatever else the body carries.
/// The task must fall inside the token's scope; one outside it is
/// reported as missing.
pub async fn update_task(
    State(state): State<AppState>,
    Path((token, task_id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let record = load_usable_token(&state, &token).await?;
    let scope = record.scope().ok_or(PublicTokenError::TokenNotFound)?;

    let task = Task::find_by_id(&state.db, task_id)
        .await
        .map_err(PublicTokenError::from)?
        .ok_or(PublicTokenError::TaskNotFound)?;

    let task_list = TaskList::find_by_id(&state.db, task.task_list_id)
        .await
        .map_err(PublicTokenError::from)?
        .ok_or(PublicTokenError::TaskNotFound)?;

    let card = Card::find_by_id(&state.db, task_list.card_id)
        .await
        .map_err(PublicTokenError::from)?
        .ok_or(PublicTokenError::TaskNotFound)?;

    if !scope_contains(scope, &card) {
        return Err(PublicTokenError::TaskNotFound.into());
    }

    let prev_data = json!({ "item": task });

    let updated = Task::set_completed(&state.db, task_id, req.is_completed)
        .await
        .map_err(PublicTokenError::from)?
        .ok_or(PublicTokenError::TaskNotFound)?;

    if let Err(e) = state
        .broadcaster
        .publish(
            &board_topic(card.board_id),
            WebhookEvent::TaskUpdate.as_str(),
            json!({ "item": updated }),
        )
        .await
    {
        tracing::warn!("Failed to broadcast taskUpdate: {}", e);
    }

    match Webhook::get_all(&state.db).await {
        Ok(webhooks) => send_webhooks(
            webhooks,
            WebhookEvent::TaskUpdate,
            json!({ "item": updated, "included": { "cards": [card] } }),
            Some(prev_data),
            WebhookActor::public(),
        ),
        Err(e) => tracing::warn!("Failed to load webhooks: {}", e),
    }

    Ok(Json(TaskResponse { item: updated }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_in(board_id: Uuid, list_id: Uuid) -> Card {
        Card {
            id: Uuid::new_v4(),
            board_id,
            list_id,
            name: "a card".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_board_scope_covers_whole_board() {
        let board_id = Uuid::new_v4();
        let card = card_in(board_id, Uuid::new_v4());

        assert!(scope_contains(TokenScope::Board(board_id), &card));
        assert!(!scope_contains(TokenScope::Board(Uuid::new_v4()), &card));
    }

    #[test]
    fn test_list_scope_requires_exact_list() {
        let list_id = Uuid::new_v4();
        let card = card_in(Uuid::new_v4(), list_id);

        assert!(scope_contains(TokenScope::List(list_id), &card));

        // Same board, different list: outside the scope
        let sibling = card_in(card.board_id, Uuid::new_v4());
        assert!(!scope_contains(TokenScope::List(list_id), &sibling));
    }

    #[test]
    fn test_card_scope_requires_exact_card() {
        let card = card_in(Uuid::new_v4(), Uuid::new_v4());

        assert!(scope_contains(TokenScope::Card(card.id), &card));
        assert!(!scope_contains(TokenScope::Card(Uuid::new_v4()), &card));
    }
}
