/// Realtime broadcast over Redis pub/sub
///
/// Every connected client subscribes (through the socket gateway) to the
/// topics its identity joined at resolution time; server-side mutations
/// publish to board-scoped topics so other clients converge. Receivers
/// must treat events as idempotent upserts-by-id: no ordering is
/// guaranteed between the actor's HTTP response and other clients'
/// socket events.
///
/// # Topics
///
/// - `board:{board_id}`: membership and card events for one board
/// - `@user:{user_id}`: cross-session notifications for one user
/// - `@accessToken:{token}`: exactly one session; carries the forced
///   logout event so a client can tell "your session was revoked" apart
///   from a network blip
///
/// # Example
///
/// ```no_run
/// use corkboard_shared::realtime::{Broadcaster, board_topic};
/// use serde_json::json;
///
/// # async fn example() -> anyhow::Result<()> {
/// let broadcaster = Broadcaster::new("redis://localhost:6379")?;
/// broadcaster
///     .publish(&board_topic(uuid::Uuid::new_v4()), "cardUpdate", json!({ "item": {} }))
///     .await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Event name published when a session is revoked
const FORCE_LOGOUT_EVENT: &str = "forceLogout";

/// Error type for broadcast operations
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for BroadcastError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => BroadcastError::Connection(err.to_string()),
            _ => BroadcastError::Command(err.to_string()),
        }
    }
}

/// Topic for one board's events
pub fn board_topic(board_id: Uuid) -> String {
    format!("board:{}", board_id)
}

/// Topic for one user's cross-session notifications
pub fn user_topic(user_id: Uuid) -> String {
    format!("@user:{}", user_id)
}

/// Topic for exactly one session, keyed by its access-token string
pub fn access_token_topic(access_token: &str) -> String {
    format!("@accessToken:{}", access_token)
}

/// Wire shape of a published message
#[derive(Debug, Serialize)]
struct BroadcastMessage<'a> {
    event: &'a str,
    data: &'a Value,
}

/// Redis-backed publisher
///
/// Cheap to clone; the `ConnectionManager` is established on first publish
/// and reconnects on failure, so constructing a `Broadcaster` does no I/O.
#[derive(Clone)]
pub struct Broadcaster {
    client: Client,
    conn: Arc<OnceCell<ConnectionManager>>,
}

impl Broadcaster {
    /// Creates a publisher for a Redis URL without connecting yet
    pub fn new(url: &str) -> Result<Self, BroadcastError> {
        let client =
            Client::open(url).map_err(|e| BroadcastError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, BroadcastError> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|e| BroadcastError::Connection(e.to_string()))?;

        Ok(conn.clone())
    }

    /// Publishes an event to a topic
    pub async fn publish(
        &self,
        topic: &str,
        event: &str,
        data: Value,
    ) -> Result<(), BroadcastError> {
        let message = serde_json::to_string(&BroadcastMessage {
            event,
            data: &data,
        })?;

        let mut conn = self.connection().await?;
        let _: () = conn.publish(topic, message).await?;

        tracing::debug!(topic, event, "Broadcast published");
        Ok(())
    }

    /// Pushes the forced-logout event to a single session's topic
    pub async fn force_logout(&self, access_token: &str) -> Result<(), BroadcastError> {
        self.publish(
            &access_token_topic(access_token),
            FORCE_LOGOUT_EVENT,
            Value::Null,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        let id = Uuid::nil();
        assert_eq!(
            board_topic(id),
            "board:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            user_topic(id),
            "@user:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(access_token_topic("abc"), "@accessToken:abc");
    }

    #[test]
    fn test_message_shape() {
        let data = serde_json::json!({ "item": { "id": 1 } });
        let message = BroadcastMessage {
            event: "listMembershipCreate",
            data: &data,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["event"], "listMembershipCreate");
        assert_eq!(json["data"]["item"]["id"], 1);
    }
}
