/// Request-identity middleware and extractor
///
/// The middleware layer runs on every request: it gathers credentials from
/// headers and cookies, asks the resolver for an identity, and attaches the
/// result to request extensions. It never rejects; handlers that require
/// authentication use the [`CurrentUser`] extractor, which turns a missing
/// identity into a 401. Public routes simply don't extract.
///
/// The layer also performs cookie repair: when the resolver accepted a
/// session whose httpOnly companion cookie was missing or wrong on a
/// non-socket transport, the cookie is re-set on the response.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use corkboard_shared::auth::resolver::{self, Credentials, Identity, Resolution};
use corkboard_shared::models::{session::Session, user::User};

use crate::{app::AppState, error::ApiError};

/// Cookie carrying the access token (socket fallback only)
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the httpOnly companion secret
pub const HTTP_ONLY_TOKEN_COOKIE: &str = "httpOnlyToken";

/// Builds the `accessToken` cookie
///
/// Readable by scripts on purpose: the socket transport needs it as its
/// header fallback.
pub fn access_token_cookie(value: &str, production: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, value.to_string()))
        .path("/")
        .secure(production)
        .same_site(SameSite::Lax)
        .build()
}

/// Builds the `httpOnlyToken` companion cookie
pub fn http_only_token_cookie(value: &str, production: bool) -> Cookie<'static> {
    Cookie::build((HTTP_ONLY_TOKEN_COOKIE, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Lax)
        .build()
}

/// Builds a removal cookie for logout
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// Extracts raw credentials from a request's headers and cookie jar
fn extract_credentials(req: &Request, jar: &CookieJar) -> Credentials {
    let header_str = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    // Socket gateways forward upgrade requests; plain HTTP never carries
    // this header
    let is_socket = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    Credentials {
        authorization: header_str("authorization"),
        cookie_access_token: jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()),
        http_only_cookie: jar
            .get(HTTP_ONLY_TOKEN_COOKIE)
            .map(|c| c.value().to_string()),
        api_key: header_str("x-api-key"),
        internal_token: header_str("x-internal-access-token"),
        is_socket,
    }
}

/// Identity-resolution middleware
///
/// Attaches a [`Resolution`] to request extensions when credentials
/// resolve; requests without an identity pass through untouched.
pub async fn current_user_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let creds = extract_credentials(&req, &jar);

    let resolution = resolver::resolve(&state.db, &state.resolver_config(), &creds)
        .await
        .map_err(|e| ApiError::InternalError(format!("Identity resolution failed: {}", e)))?;

    let repair = resolution.as_ref().and_then(|r| {
        if r.reissue_http_only_cookie {
            r.http_only_token().map(String::from)
        } else {
            None
        }
    });

    if let Some(resolution) = resolution {
        req.extensions_mut().insert(resolution);
    }

    let mut response = next.run(req).await;

    if let Some(token) = repair {
        let cookie = http_only_token_cookie(&token, state.config.api.production);
        if let Ok(value) = cookie.to_string().parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}

/// The authenticated user behind the current request
///
/// Extraction fails with 401 when no identity resolved. The internal
/// service identity carries no user and is rejected by this extractor;
/// user-scoped routes are not its surface.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,

    /// Present for session-backed identities, absent for API keys
    pub session: Option<Session>,
}

impl CurrentUser {
    /// The access token of the backing session, if any
    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let resolution = parts
            .extensions
            .get::<Resolution>()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        match &resolution.identity {
            Identity::Authenticated { user, session } => Ok(CurrentUser {
                user: user.clone(),
                session: Some(session.clone()),
            }),
            Identity::ApiKey { user } => Ok(CurrentUser {
                user: user.clone(),
                session: None,
            }),
            Identity::Internal => Err(ApiError::Forbidden(
                "Internal identity cannot act as a user".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_only_cookie_flags() {
        let cookie = http_only_token_cookie("secret", true);
        assert_eq!(cookie.name(), "httpOnlyToken");
        assert_eq!(cookie.value(), "secret");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_access_token_cookie_is_script_readable() {
        let cookie = access_token_cookie("token", false);
        assert_eq!(cookie.name(), "accessToken");
        assert_ne!(cookie.http_only(), Some(true));
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let cookie = removal_cookie(ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "");
        assert!(cookie.expires().is_some());
    }
}
