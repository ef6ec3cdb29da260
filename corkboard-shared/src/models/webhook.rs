/// Webhook model and database operations
///
/// Webhooks receive membership and task events as HTTP callbacks. Delivery
/// itself lives in [`crate::webhooks`]; this module is the row and the
/// event vocabulary.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE webhooks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     url VARCHAR(2048) NOT NULL,
///     access_token VARCHAR(512),
///     excluded_events TEXT[],
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Events emitted by the membership and public-task paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WebhookEvent {
    ListMembershipCreate,
    ListMembershipUpdate,
    ListMembershipDelete,
    CardMembershipCreate,
    CardMembershipUpdate,
    CardMembershipDelete,
    TaskUpdate,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::ListMembershipCreate => "listMembershipCreate",
            WebhookEvent::ListMembershipUpdate => "listMembershipUpdate",
            WebhookEvent::ListMembershipDelete => "listMembershipDelete",
            WebhookEvent::CardMembershipCreate => "cardMembershipCreate",
            WebhookEvent::CardMembershipUpdate => "cardMembershipUpdate",
            WebhookEvent::CardMembershipDelete => "cardMembershipDelete",
            WebhookEvent::TaskUpdate => "taskUpdate",
        }
    }
}

/// Webhook endpoint registration
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: Uuid,

    /// Callback URL (http:// or https://)
    pub url: String,

    /// Bearer token sent with each delivery, if configured
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Event names this endpoint does not want
    pub excluded_events: Option<Vec<String>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// Whether this endpoint wants the given event
    pub fn wants(&self, event: WebhookEvent) -> bool {
        match &self.excluded_events {
            Some(excluded) => !excluded.iter().any(|e| e == event.as_str()),
            None => true,
        }
    }

    pub async fn get_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks ORDER BY id")
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook_with(excluded: Option<Vec<String>>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            url: "https://example.com/hook".to_string(),
            access_token: None,
            excluded_events: excluded,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wants_all_when_no_exclusions() {
        let webhook = webhook_with(None);
        assert!(webhook.wants(WebhookEvent::ListMembershipCreate));
        assert!(webhook.wants(WebhookEvent::TaskUpdate));
    }

    #[test]
    fn test_excluded_event_filtered() {
        let webhook = webhook_with(Some(vec!["taskUpdate".to_string()]));
        assert!(!webhook.wants(WebhookEvent::TaskUpdate));
        assert!(webhook.wants(WebhookEvent::CardMembershipDelete));
    }
}
