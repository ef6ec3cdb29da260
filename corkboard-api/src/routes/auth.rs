/// Session lifecycle endpoints
///
/// # Endpoints
///
/// - `POST /api/access-tokens` - Login: mint a token and a session
/// - `DELETE /api/access-tokens/me` - Logout: soft-revoke the session
/// - `POST /api/users/me/password` - Change password, revoking every token
///
/// Login sets two cookies alongside the JSON response: `accessToken`
/// (script-readable, the socket fallback) and `httpOnlyToken` (the
/// companion secret binding the token to this browser).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::current_user::{
        access_token_cookie, http_only_token_cookie, removal_cookie, CurrentUser,
        ACCESS_TOKEN_COOKIE, HTTP_ONLY_TOKEN_COOKIE,
    },
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use corkboard_shared::{
    auth::{password, token},
    models::{session::Session, user::User},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Length of the httpOnly companion secret
const HTTP_ONLY_TOKEN_LENGTH: usize = 64;

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Single-item response envelope
#[derive(Debug, Serialize)]
pub struct ItemResponse<T> {
    pub item: T,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    /// Current password, re-verified before any change
    pub current_password: String,

    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Generates the random httpOnly companion secret
fn generate_http_only_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..HTTP_ONLY_TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/access-tokens
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "item": "eyJ..." }
/// ```
///
/// plus the `accessToken` / `httpOnlyToken` cookie pair.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same message for
///   both, so the endpoint can't be used to probe for accounts)
/// - `400 Bad Request`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<ItemResponse<String>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let user = User::find_active_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let access_token = token::sign(user.id, state.jwt_secret())?;
    let http_only_token = generate_http_only_token();

    Session::create(&state.db, user.id, &access_token, Some(&http_only_token)).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let production = state.config.api.production;
    let jar = jar
        .add(access_token_cookie(&access_token, production))
        .add(http_only_token_cookie(&http_only_token, production));

    Ok((jar, Json(ItemResponse { item: access_token })))
}

/// Logout endpoint
///
/// Soft-revokes the current session, pushes the forced-logout event to the
/// session's topic (so other tabs sharing the token disconnect cleanly),
/// and clears both cookies.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/access-tokens/me
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: The identity has no session (API-key callers)
/// - `401 Unauthorized`: Not authenticated
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<ItemResponse<String>>)> {
    let session = current
        .session
        .ok_or_else(|| ApiError::BadRequest("No session to invalidate".to_string()))?;

    Session::invalidate(&state.db, session.id).await?;

    if let Err(e) = state.broadcaster.force_logout(&session.access_token).await {
        tracing::warn!("Failed to broadcast forced logout: {}", e);
    }

    tracing::info!(user_id = %current.user.id, "User logged out");

    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(HTTP_ONLY_TOKEN_COOKIE));

    Ok((jar, Json(ItemResponse {
        item: session.access_token,
    })))
}

/// Password change endpoint
///
/// Bumping `password_changed_at` instantly voids every outstanding token,
/// so after revoking all sessions (with a forced-logout push to each) a
/// fresh token and session are minted for the caller.
///
/// # Endpoint
///
/// ```text
/// POST /api/users/me/password
/// Content-Type: application/json
///
/// {
///   "currentPassword": "old-password",
///   "newPassword": "new-password"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "item": "eyJ..." }
/// ```
///
/// the replacement access token for this device.
///
/// # Errors
///
/// - `400 Bad Request`: Current password is wrong
/// - `401 Unauthorized`: Not authenticated
/// - `400 Bad Request`: New password too weak
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<(CookieJar, Json<ItemResponse<String>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let valid = password::verify_password(&req.current_password, &current.user.password_hash)?;
    if !valid {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, current.user.id, &new_hash)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // Every session goes, this one included; other devices get the
    // explicit forced-logout event rather than a silent 401
    let revoked = Session::invalidate_all_for_user(&state.db, current.user.id).await?;
    for access_token in &revoked {
        if let Err(e) = state.broadcaster.force_logout(access_token).await {
            tracing::warn!("Failed to broadcast forced logout: {}", e);
        }
    }

    tracing::info!(
        user_id = %current.user.id,
        sessions = revoked.len(),
        "Password changed, sessions revoked"
    );

    let access_token = token::sign(current.user.id, state.jwt_secret())?;
    let http_only_token = generate_http_only_token();
    Session::create(
        &state.db,
        current.user.id,
        &access_token,
        Some(&http_only_token),
    )
    .await?;

    let production = state.config.api.production;
    let jar = jar
        .add(access_token_cookie(&access_token, production))
        .add(http_only_token_cookie(&http_only_token, production));

    Ok((jar, Json(ItemResponse { item: access_token })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_only_token_shape() {
        let token = generate_http_only_token();
        assert_eq!(token.len(), HTTP_ONLY_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_http_only_tokens_are_unique() {
        assert_ne!(generate_http_only_token(), generate_http_only_token());
    }
}
