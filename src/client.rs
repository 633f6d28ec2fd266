//! Push client collaborator seam
//!
//! The actual push protocol (device registration, long-lived connection,
//! message decoding) lives behind these traits. The coordinator hands the
//! collaborator an event sender at connect time; credential rotations and
//! message deliveries flow back over it, in arrival order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Opaque credential bundle issued by the push service.
///
/// The coordinator only ever reads the `fcm.token` path; everything else is
/// preserved verbatim for the collaborator's re-authentication needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Credentials(pub serde_json::Value);

impl Credentials {
    /// The delivery token at `fcm.token`, if present
    pub fn fcm_token(&self) -> Option<String> {
        self.0
            .get("fcm")
            .and_then(|fcm| fcm.get("token"))
            .and_then(|token| token.as_str())
            .map(|token| token.to_string())
    }
}

/// A single push message delivered by the collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Unique id of this message, retained to suppress redelivery
    pub persistent_id: String,
    /// Full message payload, forwarded to the UI process unmodified
    pub payload: serde_json::Value,
}

/// Everything the collaborator needs to (re-)register with the push service
#[derive(Debug, Clone)]
pub struct Registration {
    /// Application/project identifier for the push service
    pub sender_id: String,
    /// Prior credentials, if any (absent forces a fresh registration)
    pub credentials: Option<Credentials>,
    /// Message ids already delivered, suppressed on reconnect
    pub persistent_ids: Vec<String>,
}

/// Event emitted by a live push client
#[derive(Debug, Clone)]
pub enum PushClientEvent {
    /// The push service reissued credentials
    CredentialsChanged(Credentials),
    /// An inbound push message arrived
    MessageReceived(PushMessage),
}

/// A live connection to the push service
#[async_trait]
pub trait PushClient: Send + Sync {
    /// Tear the connection down and release its resources
    async fn teardown(&self) -> Result<(), String>;
}

/// Factory seam that establishes push service connections.
///
/// `connect` must deliver events on `events` in arrival order and stop
/// sending once the returned client has been torn down.
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(
        &self,
        registration: Registration,
        events: mpsc::UnboundedSender<PushClientEvent>,
    ) -> Result<Box<dyn PushClient>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcm_token_present() {
        let credentials = Credentials(serde_json::json!({
            "fcm": { "token": "T0" },
            "gcm": { "androidId": "123", "securityToken": "456" }
        }));

        assert_eq!(credentials.fcm_token(), Some("T0".to_string()));
    }

    #[test]
    fn test_fcm_token_absent() {
        let credentials = Credentials(serde_json::json!({ "gcm": {} }));
        assert_eq!(credentials.fcm_token(), None);
    }

    #[test]
    fn test_credentials_round_trip_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "fcm": { "token": "T0", "pushSet": "ps" },
            "keys": { "privateKey": "pk", "authSecret": "as" }
        });

        let credentials: Credentials = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&credentials).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_push_message_deserialization() {
        let json = r#"{ "persistentId": "id-1", "payload": { "title": "hi" } }"#;

        let message: PushMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.persistent_id, "id-1");
        assert_eq!(message.payload["title"], "hi");
    }
}
