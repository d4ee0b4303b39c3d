use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_CREATED: &str = "identity/user.created";
pub const USER_UPDATED: &str = "identity/user.updated";
pub const USER_DELETED: &str = "identity/user.deleted";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub name: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub id: Option<String>,
    // Epoch milliseconds, as the event framework stamps them.
    #[serde(default)]
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSyncPayload {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeletedPayload {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub enum IdentityEvent {
    Created(UserSyncPayload),
    Updated(UserSyncPayload),
    Deleted(UserDeletedPayload),
}

impl WebhookEvent {
    pub fn identity_event(&self) -> anyhow::Result<Option<IdentityEvent>> {
        let event = match self.name.as_str() {
            USER_CREATED => IdentityEvent::Created(self.user_payload()?),
            USER_UPDATED => IdentityEvent::Updated(self.user_payload()?),
            USER_DELETED => {
                let payload: UserDeletedPayload = serde_json::from_value(self.data.clone())
                    .with_context(|| format!("malformed payload for {}", self.name))?;
                IdentityEvent::Deleted(payload)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    fn user_payload(&self) -> anyhow::Result<UserSyncPayload> {
        serde_json::from_value(self.data.clone())
            .with_context(|| format!("malformed payload for {}", self.name))
    }
}

impl UserSyncPayload {
    pub fn primary_email(&self) -> Option<String> {
        self.email_addresses
            .first()
            .map(|address| address.email_address.clone())
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Purchase {
        transaction_id: Uuid,
        user_id: String,
        listing_id: Uuid,
    },
    ListingDeleted {
        listing_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sync_payload(first: Option<&str>, last: Option<&str>) -> UserSyncPayload {
        UserSyncPayload {
            id: "user_123".to_string(),
            email_addresses: vec![],
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            image_url: None,
        }
    }

    #[test]
    fn display_name_joins_and_trims() {
        assert_eq!(sync_payload(Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(sync_payload(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(sync_payload(None, Some("Lovelace")).display_name(), "Lovelace");
        assert_eq!(sync_payload(None, None).display_name(), "");
    }

    #[test]
    fn primary_email_takes_first_address() {
        let mut payload = sync_payload(None, None);
        assert_eq!(payload.primary_email(), None);

        payload.email_addresses = vec![
            EmailAddress { email_address: "first@example.com".to_string() },
            EmailAddress { email_address: "second@example.com".to_string() },
        ];
        assert_eq!(payload.primary_email(), Some("first@example.com".to_string()));
    }

    #[test]
    fn created_event_parses_provider_payload() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "name": "identity/user.created",
            "data": {
                "id": "user_abc",
                "email_addresses": [{"email_address": "ada@example.com"}],
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img.example.com/ada.png"
            }
        }))
        .unwrap();

        match event.identity_event().unwrap() {
            Some(IdentityEvent::Created(payload)) => {
                assert_eq!(payload.id, "user_abc");
                assert_eq!(payload.primary_email(), Some("ada@example.com".to_string()));
                assert_eq!(payload.display_name(), "Ada Lovelace");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn deleted_event_parses_bare_id() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "name": "identity/user.deleted",
            "data": {"id": "user_abc", "deleted": true}
        }))
        .unwrap();

        match event.identity_event().unwrap() {
            Some(IdentityEvent::Deleted(payload)) => {
                assert_eq!(payload.id, "user_abc");
                assert!(payload.deleted);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_ignored() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "name": "identity/session.created",
            "data": {"id": "sess_1"}
        }))
        .unwrap();
        assert!(event.identity_event().unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "name": "identity/user.created",
            "data": {"email_addresses": "not-a-list"}
        }))
        .unwrap();
        assert!(event.identity_event().is_err());
    }
}
