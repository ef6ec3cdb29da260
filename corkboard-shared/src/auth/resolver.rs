/// Request-to-identity resolution
///
/// Transforms raw transport credentials into zero-or-one resolved identity.
/// Resolution never raises an authentication error: it either produces an
/// identity or `None`, and only the downstream authentication policy turns
/// "no identity" into a 401. That separation lets public-token routes skip
/// the policy entirely.
///
/// # Resolution order (first match wins)
///
/// 1. `X-Internal-Access-Token` header (or a bearer token) equal to the
///    configured internal secret → internal service identity (bypasses all
///    authorization).
/// 2. Bearer token from the `Authorization` header; socket transports may
///    fall back to the `accessToken` cookie (sockets cannot reliably set
///    custom headers on reconnect).
/// 3. Token verified by the codec; then the active session looked up; then
///    the httpOnly binding evaluated under the transport's strategy; then
///    the user loaded (deactivated excluded); then the stale-token check
///    against `password_changed_at`.
/// 4. Independently, an `X-Api-Key` header resolves straight to the user
///    owning that key's hash; no session, no expiry, no staleness check.
///
/// # Binding strategies
///
/// The httpOnly companion cookie binds a bearer token to the browser that
/// obtained it, so an exfiltrated bearer token alone cannot be replayed
/// elsewhere. Sockets cannot always present the originating cookie jar
/// (cross-origin, reconnect timing), so strict binding there would cause
/// spurious logouts. The two paths are modeled as named strategies rather
/// than nested conditionals to keep the security-relevant branch auditable:
///
/// - [`BindingStrategy::Strict`] (HTTP): a mismatched cookie falls through
///   to a recovery that re-verifies the token and, when the session and
///   user still check out, accepts and re-issues the cookie to repair the
///   binding.
/// - [`BindingStrategy::Relaxed`] (sockets): the cookie match is skipped;
///   everything else (session liveness, staleness) still applies.

use sqlx::PgPool;

use super::token::{self, Claims};
use crate::models::session::Session;
use crate::models::user::User;
use crate::realtime::{access_token_topic, user_topic};

/// Bearer scheme prefix in the Authorization header
const BEARER_PREFIX: &str = "Bearer ";

/// Configuration the resolver needs
///
/// Held as process-wide state, initialized at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Secret key for the token codec
    pub token_secret: String,

    /// Shared secret for internal service calls, if configured
    pub internal_access_token: Option<String>,
}

/// Raw credentials extracted from a transport request
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Value of the `Authorization` header, if present
    pub authorization: Option<String>,

    /// `accessToken` cookie (socket fallback only)
    pub cookie_access_token: Option<String>,

    /// `httpOnlyToken` cookie
    pub http_only_cookie: Option<String>,

    /// `X-Api-Key` header
    pub api_key: Option<String>,

    /// `X-Internal-Access-Token` header
    pub internal_token: Option<String>,

    /// Whether this is a realtime/socket transport
    pub is_socket: bool,
}

impl Credentials {
    /// The access token to authenticate with, honoring the socket cookie
    /// fallback
    pub fn access_token(&self) -> Option<&str> {
        if let Some(authorization) = &self.authorization {
            if let Some(token) = authorization.strip_prefix(BEARER_PREFIX) {
                return Some(token);
            }
        }

        if self.is_socket {
            return self.cookie_access_token.as_deref();
        }

        None
    }

    /// The binding strategy for this transport
    pub fn binding_strategy(&self) -> BindingStrategy {
        if self.is_socket {
            BindingStrategy::Relaxed
        } else {
            BindingStrategy::Strict
        }
    }
}

/// How the httpOnly companion cookie is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStrategy {
    /// HTTP: require the cookie match; on mismatch, recover by re-issuing
    Strict,

    /// Sockets: skip the cookie match entirely
    Relaxed,
}

/// Outcome of evaluating one session against one set of credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDecision {
    /// Session accepted as-is
    Accept,

    /// Session accepted, but the httpOnly cookie should be re-set on the
    /// response to repair the binding (strict transports only)
    AcceptRepairCookie,

    /// Session rejected: the token predates the user's password change
    RejectStale,
}

/// Pure decision core: evaluates binding and staleness over records that
/// have already been fetched
///
/// Kept free of I/O so the branch table is unit-testable.
pub fn evaluate_session(
    claims: &Claims,
    session: &Session,
    user: &User,
    http_only_cookie: Option<&str>,
    strategy: BindingStrategy,
) -> SessionDecision {
    if user.token_is_stale(claims.issued_at()) {
        return SessionDecision::RejectStale;
    }

    let Some(expected) = session.http_only_token.as_deref() else {
        // Session was never cookie-bound (e.g. created via API)
        return SessionDecision::Accept;
    };

    match strategy {
        BindingStrategy::Relaxed => SessionDecision::Accept,
        BindingStrategy::Strict => {
            if http_only_cookie == Some(expected) {
                SessionDecision::Accept
            } else {
                // Token is valid and the session is live, but the browser
                // lost or never had the companion cookie. Accept and
                // repair the binding rather than forcing a logout.
                SessionDecision::AcceptRepairCookie
            }
        }
    }
}

/// A resolved identity
#[derive(Debug, Clone)]
pub enum Identity {
    /// Internal service call; bypasses all authorization
    Internal,

    /// Session-backed user
    Authenticated { user: User, session: Session },

    /// API-key user; no session object
    ApiKey { user: User },
}

impl Identity {
    /// The user behind this identity, if it is a real user
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Internal => None,
            Identity::Authenticated { user, .. } | Identity::ApiKey { user } => Some(user),
        }
    }
}

/// The result of resolution, attached to the request context
#[derive(Debug, Clone)]
pub struct Resolution {
    pub identity: Identity,

    /// Strict-path recovery happened; the middleware should re-set the
    /// httpOnly cookie on the response (never set for sockets)
    pub reissue_http_only_cookie: bool,
}

impl Resolution {
    /// Broadcast topics a socket transport joins as a side effect of
    /// resolution
    ///
    /// The token-keyed topic lets a single-session logout push a forced
    /// disconnect; the user-keyed topic carries cross-session events.
    pub fn socket_topics(&self) -> Vec<String> {
        match &self.identity {
            Identity::Internal => vec![],
            Identity::Authenticated { user, session } => vec![
                access_token_topic(&session.access_token),
                user_topic(user.id),
            ],
            Identity::ApiKey { user } => vec![user_topic(user.id)],
        }
    }

    /// The httpOnly secret to re-issue, when repair was requested
    pub fn http_only_token(&self) -> Option<&str> {
        match &self.identity {
            Identity::Authenticated { session, .. } => session.http_only_token.as_deref(),
            _ => None,
        }
    }
}

/// Resolves a request to zero-or-one identity
///
/// Authentication failures are swallowed into `Ok(None)` with a warn log;
/// only infrastructure errors (database) propagate.
pub async fn resolve(
    pool: &PgPool,
    config: &ResolverConfig,
    creds: &Credentials,
) -> Result<Option<Resolution>, sqlx::Error> {
    if let Some(internal) = &config.internal_access_token {
        // Either the dedicated header or a bearer token equal to the secret
        let presented = creds
            .internal_token
            .as_deref()
            .or_else(|| creds.access_token());

        if presented == Some(internal.as_str()) {
            return Ok(Some(Resolution {
                identity: Identity::Internal,
                reissue_http_only_cookie: false,
            }));
        }
    }

    if let Some(access_token) = creds.access_token() {
        return resolve_session(pool, config, creds, access_token).await;
    }

    if let Some(api_key) = &creds.api_key {
        return resolve_api_key(pool, api_key).await;
    }

    Ok(None)
}

async fn resolve_session(
    pool: &PgPool,
    config: &ResolverConfig,
    creds: &Credentials,
    access_token: &str,
) -> Result<Option<Resolution>, sqlx::Error> {
    let claims = match token::verify(access_token, &config.token_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Token verification failed: {}", e);
            return Ok(None);
        }
    };

    let Some(session) = Session::find_active_by_access_token(pool, access_token).await? else {
        tracing::warn!("No active session for access token");
        return Ok(None);
    };

    let Some(user) = User::find_active_by_id(pool, claims.subject).await? else {
        tracing::warn!(user_id = %claims.subject, "User not found or deactivated");
        return Ok(None);
    };

    match evaluate_session(
        &claims,
        &session,
        &user,
        creds.http_only_cookie.as_deref(),
        creds.binding_strategy(),
    ) {
        SessionDecision::Accept => Ok(Some(Resolution {
            identity: Identity::Authenticated { user, session },
            reissue_http_only_cookie: false,
        })),
        SessionDecision::AcceptRepairCookie => {
            tracing::warn!(
                user_id = %user.id,
                "httpOnly cookie mismatch; accepting session and repairing binding"
            );
            Ok(Some(Resolution {
                identity: Identity::Authenticated { user, session },
                reissue_http_only_cookie: !creds.is_socket,
            }))
        }
        SessionDecision::RejectStale => {
            tracing::warn!(
                user_id = %user.id,
                "Token predates password change; rejecting"
            );
            Ok(None)
        }
    }
}

async fn resolve_api_key(
    pool: &PgPool,
    api_key: &str,
) -> Result<Option<Resolution>, sqlx::Error> {
    if !super::api_key::validate_api_key_format(api_key) {
        tracing::warn!("Malformed API key");
        return Ok(None);
    }

    let hash = super::api_key::hash_api_key(api_key);

    let Some(user) = User::find_active_by_api_key_hash(pool, &hash).await? else {
        tracing::warn!("No user for API key hash");
        return Ok(None);
    };

    Ok(Some(Resolution {
        identity: Identity::ApiKey { user },
        reissue_http_only_cookie: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn claims_issued_now(subject: Uuid) -> Claims {
        Claims::new(subject)
    }

    fn session_with(http_only_token: Option<&str>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_token: "signed-token".to_string(),
            http_only_token: http_only_token.map(String::from),
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user_with_password_changed_at(changed_at: chrono::DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            username: None,
            role: UserRole::Regular,
            password_hash: "$argon2id$stub".to_string(),
            password_changed_at: changed_at,
            api_key_hash: None,
            language: None,
            deactivated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fresh_user() -> User {
        user_with_password_changed_at(Utc::now() - Duration::days(1))
    }

    #[test]
    fn test_access_token_from_authorization_header() {
        let creds = Credentials {
            authorization: Some("Bearer abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.access_token(), Some("abc123"));
    }

    #[test]
    fn test_cookie_fallback_is_socket_only() {
        let mut creds = Credentials {
            cookie_access_token: Some("from-cookie".to_string()),
            is_socket: false,
            ..Default::default()
        };
        assert_eq!(creds.access_token(), None);

        creds.is_socket = true;
        assert_eq!(creds.access_token(), Some("from-cookie"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let creds = Credentials {
            authorization: Some("Bearer from-header".to_string()),
            cookie_access_token: Some("from-cookie".to_string()),
            is_socket: true,
            ..Default::default()
        };
        assert_eq!(creds.access_token(), Some("from-header"));
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let creds = Credentials {
            authorization: Some("Basic dXNlcjpwYXNz".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.access_token(), None);
    }

    #[test]
    fn test_strategy_by_transport() {
        let http = Credentials::default();
        assert_eq!(http.binding_strategy(), BindingStrategy::Strict);

        let socket = Credentials {
            is_socket: true,
            ..Default::default()
        };
        assert_eq!(socket.binding_strategy(), BindingStrategy::Relaxed);
    }

    #[test]
    fn test_unbound_session_accepts() {
        let user = fresh_user();
        let claims = claims_issued_now(user.id);
        let session = session_with(None);

        for strategy in [BindingStrategy::Strict, BindingStrategy::Relaxed] {
            assert_eq!(
                evaluate_session(&claims, &session, &user, None, strategy),
                SessionDecision::Accept
            );
        }
    }

    #[test]
    fn test_strict_matching_cookie_accepts() {
        let user = fresh_user();
        let claims = claims_issued_now(user.id);
        let session = session_with(Some("secret"));

        assert_eq!(
            evaluate_session(
                &claims,
                &session,
                &user,
                Some("secret"),
                BindingStrategy::Strict
            ),
            SessionDecision::Accept
        );
    }

    #[test]
    fn test_strict_mismatch_repairs_cookie() {
        let user = fresh_user();
        let claims = claims_issued_now(user.id);
        let session = session_with(Some("secret"));

        // Wrong cookie
        assert_eq!(
            evaluate_session(
                &claims,
                &session,
                &user,
                Some("wrong"),
                BindingStrategy::Strict
            ),
            SessionDecision::AcceptRepairCookie
        );

        // Missing cookie
        assert_eq!(
            evaluate_session(&claims, &session, &user, None, BindingStrategy::Strict),
            SessionDecision::AcceptRepairCookie
        );
    }

    #[test]
    fn test_relaxed_skips_binding() {
        let user = fresh_user();
        let claims = claims_issued_now(user.id);
        let session = session_with(Some("secret"));

        assert_eq!(
            evaluate_session(&claims, &session, &user, None, BindingStrategy::Relaxed),
            SessionDecision::Accept
        );
        assert_eq!(
            evaluate_session(
                &claims,
                &session,
                &user,
                Some("wrong"),
                BindingStrategy::Relaxed
            ),
            SessionDecision::Accept
        );
    }

    #[test]
    fn test_stale_token_rejected_under_both_strategies() {
        // Password changed after the token was issued
        let user = user_with_password_changed_at(Utc::now() + Duration::seconds(10));
        let claims = claims_issued_now(user.id);
        let session = session_with(Some("secret"));

        for strategy in [BindingStrategy::Strict, BindingStrategy::Relaxed] {
            assert_eq!(
                evaluate_session(&claims, &session, &user, Some("secret"), strategy),
                SessionDecision::RejectStale
            );
        }
    }

    #[test]
    fn test_socket_topics_for_authenticated() {
        let user = fresh_user();
        let user_id = user.id;
        let session = session_with(None);
        let token = session.access_token.clone();

        let resolution = Resolution {
            identity: Identity::Authenticated { user, session },
            reissue_http_only_cookie: false,
        };

        let topics = resolution.socket_topics();
        assert_eq!(topics.len(), 2);
        assert!(topics.contains(&access_token_topic(&token)));
        assert!(topics.contains(&user_topic(user_id)));
    }

    #[test]
    fn test_socket_topics_for_api_key() {
        let user = fresh_user();
        let user_id = user.id;

        let resolution = Resolution {
            identity: Identity::ApiKey { user },
            reissue_http_only_cookie: false,
        };

        assert_eq!(resolution.socket_topics(), vec![user_topic(user_id)]);
    }

    #[test]
    fn test_internal_identity_has_no_user() {
        let resolution = Resolution {
            identity: Identity::Internal,
            reissue_http_only_cookie: false,
        };

        assert!(resolution.identity.user().is_none());
        assert!(resolution.socket_topics().is_empty());
    }
}
