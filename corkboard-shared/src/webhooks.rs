/// Outbound webhook delivery
///
/// Deliveries are fire-and-forget: each one is posted from a spawned task
/// so the request that triggered it never waits on a slow endpoint, and
/// failures are logged rather than surfaced.
///
/// The payload shape is stable:
/// `{ event, data, prevData?, user? }` where `data` is the familiar
/// `{ item, included }` envelope and `user` identifies the actor (a
/// synthetic "Public User" entry for anonymous task updates).

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::webhook::{Webhook, WebhookEvent};

/// Delivery timeout per endpoint
const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// The actor attributed to a webhook delivery
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookActor {
    /// Null for the synthetic public user
    pub id: Option<uuid::Uuid>,
    pub name: String,
    pub username: String,
}

impl WebhookActor {
    /// A real authenticated user
    pub fn user(id: uuid::Uuid, name: &str, username: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            username: username.to_string(),
        }
    }

    /// The actor for an authenticated user; the email stands in for a
    /// missing handle
    pub fn from_user(user: &crate::models::user::User) -> Self {
        Self::user(
            user.id,
            &user.name,
            user.username.as_deref().unwrap_or(&user.email),
        )
    }

    /// The synthetic identity for anonymous public-token writes
    pub fn public() -> Self {
        Self {
            id: None,
            name: "Public User".to_string(),
            username: "public".to_string(),
        }
    }
}

/// Wire payload for a single delivery
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    event: &'a str,
    data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev_data: Option<&'a Value>,
    user: &'a WebhookActor,
}

/// Sends an event to every registered endpoint that wants it
///
/// Spawns one task per endpoint; the caller returns immediately.
pub fn send_webhooks(
    webhooks: Vec<Webhook>,
    event: WebhookEvent,
    data: Value,
    prev_data: Option<Value>,
    actor: WebhookActor,
) {
    let interested: Vec<Webhook> = webhooks.into_iter().filter(|w| w.wants(event)).collect();

    if interested.is_empty() {
        return;
    }

    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to build webhook client: {}", e);
                return;
            }
        };

        let payload = WebhookPayload {
            event: event.as_str(),
            data: &data,
            prev_data: prev_data.as_ref(),
            user: &actor,
        };

        for webhook in &interested {
            let mut request = client.post(&webhook.url).json(&payload);

            if let Some(token) = &webhook.access_token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %webhook.url, event = event.as_str(), "Webhook delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %webhook.url,
                        status = %response.status(),
                        "Webhook endpoint returned an error"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %webhook.url, "Webhook delivery failed: {}", e);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_actor_shape() {
        let actor = WebhookActor::public();
        let json = serde_json::to_value(&actor).unwrap();

        assert_eq!(json["id"], serde_json::Value::Null);
        assert_eq!(json["name"], "Public User");
        assert_eq!(json["username"], "public");
    }

    #[test]
    fn test_user_actor_carries_the_id() {
        let id = uuid::Uuid::new_v4();
        let actor = WebhookActor::user(id, "Alice", "alice");
        let json = serde_json::to_value(&actor).unwrap();

        assert_eq!(json["id"], serde_json::json!(id));
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_payload_omits_absent_prev_data() {
        let actor = WebhookActor::public();
        let data = serde_json::json!({ "item": {} });
        let payload = WebhookPayload {
            event: "taskUpdate",
            data: &data,
            prev_data: None,
            user: &actor,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("prevData").is_none());
        assert_eq!(json["event"], "taskUpdate");
    }
}
