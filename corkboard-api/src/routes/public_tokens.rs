/// Public-access token management
///
/// Minting, inspecting, and revoking the opaque tokens that grant
/// anonymous read access to one board, list, or card. Every operation is
/// gated on project-manager standing over the owning project; a mere board
/// member gets 403, an outsider 404.
///
/// # Endpoints
///
/// - `POST/GET/DELETE /api/boards/:boardId/public-token`
/// - `POST/GET/DELETE /api/lists/:listId/public-token`
/// - `POST/GET/DELETE /api/cards/:cardId/public-token`
///
/// At most one token exists per scope, enforced by a pre-check. The
/// pre-check and the insert are not atomic, so two simultaneous creates
/// can both pass it; the duplicate is harmless (either token works, both
/// are revocable) and the window is not worth a serialized transaction.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::current_user::CurrentUser,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use corkboard_shared::{
    auth::authorization,
    models::{
        card::Card,
        list::List,
        public_access_token::{PublicAccessToken, PublicTokenError, TokenScope},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Create request; an absent body means a token that never expires
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Expiry instant; the token is valid strictly before this moment
    pub expires_at: Option<DateTime<Utc>>,
}

/// Single-item response envelope
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: PublicAccessToken,
}

/// Parses the optional create body
///
/// An empty body is a valid request for a token that never expires. A
/// non-empty body that fails to parse is a 400; treating it as absent
/// would silently mint a non-expiring token from a typo in `expiresAt`.
fn parse_create_body(body: &Bytes) -> ApiResult<CreateRequest> {
    if body.is_empty() {
        return Ok(CreateRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid request body: {}", err)))
}

/// Verifies project-manager standing over the scope's owning project
///
/// Lists and cards are first walked up to their board; a missing resource
/// is indistinguishable from one the actor may not see.
async fn require_manager_for_scope(
    state: &AppState,
    current: &CurrentUser,
    scope: TokenScope,
) -> ApiResult<()> {
    let board_id = match scope {
        TokenScope::Board(board_id) => board_id,
        TokenScope::List(list_id) => {
            List::find_by_id(&state.db, list_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?
                .board_id
        }
        TokenScope::Card(card_id) => {
            Card::find_by_id(&state.db, card_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?
                .board_id
        }
    };

    authorization::require_project_manager(&state.db, &current.user, board_id).await?;
    Ok(())
}

async fn create_for_scope(
    state: &AppState,
    current: &CurrentUser,
    scope: TokenScope,
    expires_at: Option<DateTime<Utc>>,
) -> ApiResult<Json<ItemResponse>> {
    require_manager_for_scope(state, current, scope).await?;

    if PublicAccessToken::find_by_scope(&state.db, scope)
        .await?
        .is_some()
    {
        return Err(PublicTokenError::TokenAlreadyExists.into());
    }

    let item = PublicAccessToken::create(&state.db, scope, expires_at).await?;

    tracing::info!(user_id = %current.user.id, token_id = %item.id, "Public token created");

    Ok(Json(ItemResponse { item }))
}

async fn show_for_scope(
    state: &AppState,
    current: &CurrentUser,
    scope: TokenScope,
) -> ApiResult<Json<ItemResponse>> {
    require_manager_for_scope(state, current, scope).await?;

    let item = PublicAccessToken::find_by_scope(&state.db, scope)
        .await?
        .ok_or(PublicTokenError::TokenNotFound)?;

    Ok(Json(ItemResponse { item }))
}

async fn delete_for_scope(
    state: &AppState,
    current: &CurrentUser,
    scope: TokenScope,
) -> ApiResult<Json<ItemResponse>> {
    require_manager_for_scope(state, current, scope).await?;

    let item = PublicAccessToken::delete_by_scope(&state.db, scope)
        .await?
        .ok_or(PublicTokenError::TokenNotFound)?;

    tracing::info!(user_id = %current.user.id, token_id = %item.id, "Public token revoked");

    Ok(Json(ItemResponse { item }))
}

pub async fn create_for_board(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(board_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<ItemResponse>> {
    let req = parse_create_body(&body)?;
    create_for_scope(&state, &current, TokenScope::Board(board_id), req.expires_at).await
}

pub async fn show_for_board(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    show_for_scope(&state, &current, TokenScope::Board(board_id)).await
}

pub async fn delete_for_board(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    delete_for_scope(&state, &current, TokenScope::Board(board_id)).await
}

pub async fn create_for_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(list_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<ItemResponse>> {
    let req = parse_create_body(&body)?;
    create_for_scope(&state, &current, TokenScope::List(list_id), req.expires_at).await
}

pub async fn show_for_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    show_for_scope(&state, &current, TokenScope::List(list_id)).await
}

pub async fn delete_for_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    delete_for_scope(&state, &current, TokenScope::List(list_id)).await
}

pub async fn create_for_card(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(card_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<ItemResponse>> {
    let req = parse_create_body(&body)?;
    create_for_scope(&state, &current, TokenScope::Card(card_id), req.expires_at).await
}

pub async fn show_for_card(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    show_for_scope(&state, &current, TokenScope::Card(card_id)).await
}

pub async fn delete_for_card(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Json<ItemResponse>> {
    delete_for_scope(&state, &current, TokenScope::Card(card_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_create_body_means_no_expiry() {
        let req = parse_create_body(&Bytes::new()).unwrap();
        assert!(req.expires_at.is_none());
    }

    #[test]
    fn test_create_body_with_expiry_parses() {
        let body = Bytes::from_static(br#"{"expiresAt": "2030-01-01T00:00:00Z"}"#);
        let req = parse_create_body(&body).unwrap();
        assert!(req.expires_at.is_some());
    }

    #[test]
    fn test_malformed_expiry_is_rejected_not_ignored() {
        let body = Bytes::from_static(br#"{"expiresAt": "not-a-date"}"#);
        let err = parse_create_body(&body).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let body = Bytes::from_static(b"{\"expiresAt\":");
        let err = parse_create_body(&body).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
