// Event types and payload structures for the host message channel
// One inbound command from the UI process, four outbound notifications

use serde::{Deserialize, Serialize};

// Inbound command (UI -> backend)
pub const COMMAND_START_SERVICE: &str = "push:start_service";

// Outbound event name constants (backend -> UI)
pub const EVENT_SERVICE_STARTED: &str = "push:service_started";
pub const EVENT_SERVICE_ERROR: &str = "push:service_error";
pub const EVENT_NOTIFICATION_RECEIVED: &str = "push:notification_received";
pub const EVENT_TOKEN_UPDATED: &str = "push:token_updated";

/// An event carried over the host channel as a JSON frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEvent {
    /// Event type (e.g., "push:service_started")
    pub event: String,
    /// Event payload as JSON value
    pub payload: serde_json::Value,
}

impl HostEvent {
    /// Build an event from a name and any serializable payload
    pub fn new(event: &str, payload: impl Serialize) -> Self {
        Self {
            event: event.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Payload for service started events
///
/// The token is absent when the service started before any credentials
/// were issued (first registration in a fresh profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStartedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Payload for service error events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceErrorPayload {
    pub message: String,
}

/// Payload for token updated events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdatedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Payload for the start command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartServicePayload {
    pub sender_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constants() {
        assert_eq!(COMMAND_START_SERVICE, "push:start_service");
        assert_eq!(EVENT_SERVICE_STARTED, "push:service_started");
        assert_eq!(EVENT_SERVICE_ERROR, "push:service_error");
        assert_eq!(EVENT_NOTIFICATION_RECEIVED, "push:notification_received");
        assert_eq!(EVENT_TOKEN_UPDATED, "push:token_updated");
    }

    #[test]
    fn test_service_started_payload_serialization() {
        let payload = ServiceStartedPayload {
            token: Some("fcm-token-abc".to_string()),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"token\":\"fcm-token-abc\""));
    }

    #[test]
    fn test_service_started_payload_omits_absent_token() {
        let payload = ServiceStartedPayload { token: None };

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_service_error_payload_serialization() {
        let payload = ServiceErrorPayload {
            message: "storage error: disk full".to_string(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"message\":\"storage error: disk full\""));
    }

    #[test]
    fn test_start_service_payload_deserialization() {
        let json = r#"{ "senderId": "1234567890" }"#;

        let payload: StartServicePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.sender_id, "1234567890");
    }

    #[test]
    fn test_host_event_round_trip() {
        let event = HostEvent::new(
            EVENT_TOKEN_UPDATED,
            TokenUpdatedPayload {
                token: Some("t-1".to_string()),
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: HostEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event, EVENT_TOKEN_UPDATED);
        assert_eq!(parsed.payload["token"], "t-1");
    }
}
