/// Access-token codec
///
/// This module signs and verifies the compact identity tokens that back
/// Corkboard sessions. A token encodes the subject (user id) and the moment
/// it was issued; the session row in the database is the revocation handle,
/// so tokens themselves are long-lived.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC-SHA256)
/// - **Claims**: subject, issued-at, expiration, issuer
/// - **Validation**: Signature, expiration, and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes
///
/// The issued-at claim matters beyond bookkeeping: a token issued before
/// the user's `password_changed_at` is void, which gives immediate global
/// revocation on password change without enumerating outstanding tokens.
///
/// # Example
///
/// ```
/// use corkboard_shared::auth::token::{sign, verify};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
///
/// let token = sign(user_id, secret)?;
/// let claims = verify(&token, secret)?;
/// assert_eq!(claims.subject, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer embedded in every token
const ISSUER: &str = "corkboard";

/// Default token lifetime
///
/// Sessions are the revocation mechanism; the expiry claim is a backstop.
const DEFAULT_LIFETIME_DAYS: i64 = 365;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature is wrong, structure is malformed, or issuer doesn't match
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Claims carried by an access token
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "corkboard")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    #[serde(rename = "sub")]
    pub subject: Uuid,

    /// Issuer - Always "corkboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a subject with the default lifetime
    pub fn new(subject: Uuid) -> Self {
        Self::with_lifetime(subject, Duration::days(DEFAULT_LIFETIME_DAYS))
    }

    /// Creates claims with a custom lifetime
    pub fn with_lifetime(subject: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            subject,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    /// The moment this token was issued
    ///
    /// Compared against `User::password_changed_at` on every request; a
    /// token that predates the last password change is stale.
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Checks if the expiry claim has passed
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs an access token for a subject
///
/// # Arguments
///
/// * `subject` - User ID to embed
/// * `secret` - Secret key for signing (should be at least 32 bytes)
///
/// # Errors
///
/// Returns `TokenError::CreateError` if token encoding fails
pub fn sign(subject: Uuid, secret: &str) -> Result<String, TokenError> {
    sign_claims(&Claims::new(subject), secret)
}

/// Signs pre-built claims
///
/// Used by tests and by callers that need a non-default lifetime.
pub fn sign_claims(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a token and extracts its claims
///
/// Verifies:
/// - Signature is valid
/// - Token hasn't expired
/// - Issuer is "corkboard"
///
/// # Errors
///
/// Returns `TokenError::Expired` when the expiry claim has passed and
/// `TokenError::InvalidToken` for every other failure (bad signature,
/// malformed structure, wrong issuer).
pub fn verify(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::InvalidToken(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_creation() {
        let subject = Uuid::new_v4();
        let claims = Claims::new(subject);

        assert_eq!(claims.subject, subject);
        assert_eq!(claims.iss, "corkboard");
        assert!(!claims.is_expired());
        assert!(claims.issued_at() <= Utc::now());
    }

    #[test]
    fn test_sign_and_verify() {
        let subject = Uuid::new_v4();
        let token = sign(subject, SECRET).expect("should sign");

        let claims = verify(&token, SECRET).expect("should verify");
        assert_eq!(claims.subject, subject);
        assert_eq!(claims.iss, "corkboard");
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let token = sign(Uuid::new_v4(), SECRET).expect("should sign");

        let result = verify(&token, "a-completely-different-secret-value");
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_malformed_token() {
        let result = verify("not-a-token", SECRET);
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_expired_token() {
        let claims = Claims::with_lifetime(Uuid::new_v4(), Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = sign_claims(&claims, SECRET).expect("should sign");
        let result = verify(&token, SECRET);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_issued_at_round_trip() {
        let subject = Uuid::new_v4();
        let before = Utc::now().timestamp();

        let token = sign(subject, SECRET).expect("should sign");
        let claims = verify(&token, SECRET).expect("should verify");

        let after = Utc::now().timestamp();
        assert!(claims.iat >= before && claims.iat <= after);
    }
}
