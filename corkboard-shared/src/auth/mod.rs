/// Authentication and authorization utilities
///
/// This module provides the security core of Corkboard:
///
/// # Modules
///
/// - [`token`]: Signed access-token codec (HS256)
/// - [`password`]: Argon2id password hashing and validation
/// - [`api_key`]: API key generation and hashing
/// - [`resolver`]: Request-to-identity resolution (bearer token, cookies,
///   API key, internal service token)
/// - [`authorization`]: Membership-based permission checks
/// - [`single_flight`]: At-most-one-in-flight token refresh gate
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Access Tokens**: HS256 signing, session-backed revocation
/// - **API Keys**: Secure random generation with SHA-256 hashing
/// - **httpOnly Binding**: Companion cookie binds a bearer token to the
///   browser that obtained it
pub mod api_key;
pub mod authorization;
pub mod password;
pub mod resolver;
pub mod single_flight;
pub mod token;
