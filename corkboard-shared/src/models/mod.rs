/// Database models
///
/// Each model is a `sqlx::FromRow` struct with its query operations in an
/// `impl` block. Wire serialization uses camelCase field names, which is the
/// stable external format consumed by the client.
///
/// Resource tree: Project 1-N Board 1-N List 1-N Card. Membership rows are
/// N-N joins between User and {Board, List, Card}. A PublicAccessToken
/// belongs to exactly one of Board/List/Card.

pub mod board;
pub mod card;
pub mod custom_field;
pub mod label;
pub mod list;
pub mod membership;
pub mod project;
pub mod public_access_token;
pub mod session;
pub mod task;
pub mod user;
pub mod webhook;
