/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Session lifecycle (login, logout, password change)
/// - `projects`: Accessible-projects index
/// - `list_memberships` / `card_memberships`: Narrow-scope grants
/// - `public_tokens`: Public-access token management
/// - `public`: Anonymous resolution and the public task update

pub mod auth;
pub mod card_memberships;
pub mod health;
pub mod list_memberships;
pub mod projects;
pub mod public;
pub mod public_tokens;
