//! Backend command handlers for IPC communication
//!
//! Thin wrappers that hosts register against their command transport. Errors
//! cross the boundary as strings, matching the host channel's error events.

use crate::events::{HostEvent, StartServicePayload, COMMAND_START_SERVICE};
use crate::service::{NotificationService, ServiceState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// State for the push notification service
pub struct PushServiceState {
    /// The coordinator instance
    pub service: Arc<NotificationService>,
}

impl PushServiceState {
    /// Create new push service state around a coordinator
    pub fn new(service: NotificationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Get a clone of the coordinator for async operations
    pub fn get_service(&self) -> Arc<NotificationService> {
        self.service.clone()
    }
}

/// Input for starting the notification service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNotificationServiceInput {
    /// Push project sender identifier
    pub sender_id: String,
}

/// Response for service lifecycle commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStateResponse {
    pub state: ServiceState,
}

/// Start the notification service (idempotent after the first start)
pub async fn start_notification_service(
    input: StartNotificationServiceInput,
    push_state: &PushServiceState,
) -> Result<ServiceStateResponse, String> {
    let state = push_state.service.start(&input.sender_id).await;
    Ok(ServiceStateResponse { state })
}

/// Reset the notification service, clearing persisted registration state
pub async fn reset_notification_service(
    push_state: &PushServiceState,
) -> Result<ServiceStateResponse, String> {
    push_state
        .service
        .reset()
        .await
        .map_err(|e| e.to_string())?;
    Ok(ServiceStateResponse {
        state: push_state.service.state(),
    })
}

/// Route an inbound host event frame to the matching command handler
pub async fn dispatch(
    push_state: &PushServiceState,
    command: HostEvent,
) -> Result<ServiceStateResponse, String> {
    match command.event.as_str() {
        COMMAND_START_SERVICE => {
            let payload: StartServicePayload = serde_json::from_value(command.payload)
                .map_err(|e| format!("Invalid start command payload: {}", e))?;
            start_notification_service(
                StartNotificationServiceInput {
                    sender_id: payload.sender_id,
                },
                push_state,
            )
            .await
        }
        other => Err(format!("Unknown command: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_input_deserialization() {
        let json = r#"{ "senderId": "82striker" }"#;

        let input: StartNotificationServiceInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.sender_id, "82striker");
    }

    #[test]
    fn test_state_response_serialization() {
        let response = ServiceStateResponse {
            state: ServiceState::Started,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"state\":\"started\""));
    }
}
