//! Notification service coordinator
//!
//! Owns the start/stop lifecycle of the push client collaborator, decides
//! whether a new registration is required, keeps the persisted registration
//! state current, and forwards results to the UI process over the host
//! channel. One coordinator per registration session; hosts that need
//! independent sessions construct independent coordinators.

use crate::channel::HostChannel;
use crate::client::{Credentials, PushClient, PushClientEvent, PushConnector, PushMessage, Registration};
use crate::config::BridgeConfig;
use crate::error::ServiceError;
use crate::events::{
    HostEvent, ServiceErrorPayload, ServiceStartedPayload, TokenUpdatedPayload,
    EVENT_NOTIFICATION_RECEIVED, EVENT_SERVICE_ERROR, EVENT_SERVICE_STARTED, EVENT_TOKEN_UPDATED,
};
use crate::storage::{
    ConfigStore, StoreResult, KEY_CREDENTIALS, KEY_CREDENTIALS_ROTATED_AT, KEY_PERSISTENT_IDS,
    KEY_SENDER_ID,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Coordinator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Unstarted,
    Starting,
    Started,
    Error,
}

/// A live push client plus the task draining its events
struct ClientHandle {
    client: Box<dyn PushClient>,
    pump: JoinHandle<()>,
}

/// Push notification service coordinator
pub struct NotificationService {
    store: Arc<dyn ConfigStore>,
    channel: Arc<dyn HostChannel>,
    connector: Arc<dyn PushConnector>,
    config: BridgeConfig,
    /// One-shot guard; set synchronously before any suspension point so
    /// concurrent start commands cannot construct two clients
    started: AtomicBool,
    state: Mutex<ServiceState>,
    client: tokio::sync::Mutex<Option<ClientHandle>>,
}

impl NotificationService {
    /// Create a new coordinator over the given collaborators
    pub fn new(
        store: Arc<dyn ConfigStore>,
        channel: Arc<dyn HostChannel>,
        connector: Arc<dyn PushConnector>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            store,
            channel,
            connector,
            config,
            started: AtomicBool::new(false),
            state: Mutex::new(ServiceState::Unstarted),
            client: tokio::sync::Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        *self.lock_state()
    }

    /// Whether a start has been accepted in this coordinator's lifetime
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Handle a start command from the UI process.
    ///
    /// Idempotent after the first accepted start: subsequent commands reply
    /// with the persisted token and perform no further work, even when the
    /// sender id differs. All failures are converted into a
    /// `push:service_error` event; nothing propagates to the caller.
    pub async fn start(&self, sender_id: &str) -> ServiceState {
        if self.started.swap(true, Ordering::SeqCst) {
            log::debug!("Notification service already started, replying with stored token");
            match self.stored_credentials() {
                Ok(credentials) => {
                    self.emit_started(credentials.and_then(|c| c.fcm_token()));
                }
                Err(e) => self.emit_error(&e),
            }
            return self.state();
        }

        self.set_state(ServiceState::Starting);

        match self.do_start(sender_id).await {
            Ok(token) => {
                log::info!("Notification service started for sender {}", sender_id);
                self.set_state(ServiceState::Started);
                self.emit_started(token);
            }
            Err(e) => {
                log::error!("Error while starting the notification service: {}", e);
                // A failure after connect leaves a live client in the slot;
                // discard it so a later retry cannot stack a second connection
                self.discard_client().await;
                self.set_state(ServiceState::Error);
                self.emit_error(&e);
                if self.config.retry_on_error {
                    // Policy: allow the next start command to retry
                    self.started.store(false, Ordering::SeqCst);
                    self.set_state(ServiceState::Unstarted);
                }
            }
        }

        self.state()
    }

    async fn do_start(&self, sender_id: &str) -> Result<Option<String>, ServiceError> {
        let credentials = self.stored_credentials()?;
        let saved_sender_id = self.stored_sender_id()?;
        let token = credentials.as_ref().and_then(|c| c.fcm_token());

        if credentials.is_some() && token.is_none() {
            return Err(ServiceError::InvalidCredentials(
                "stored credentials are missing fcm.token".to_string(),
            ));
        }

        // Register only if there are no credentials yet or the sender changed;
        // otherwise the stored credentials are reused as-is
        let needs_registration =
            credentials.is_none() || saved_sender_id.as_deref() != Some(sender_id);

        if needs_registration {
            let persistent_ids =
                read_persistent_ids(self.store.as_ref()).map_err(ServiceError::storage)?;
            log::info!(
                "Registering push client for sender {} ({} known message ids)",
                sender_id,
                persistent_ids.len()
            );

            let registration = Registration {
                sender_id: sender_id.to_string(),
                credentials: credentials.clone(),
                persistent_ids,
            };

            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let client = self
                .connector
                .connect(registration, event_tx)
                .await
                .map_err(ServiceError::Registration)?;

            let pump = EventPump {
                store: self.store.clone(),
                channel: self.channel.clone(),
                max_persistent_ids: self.config.max_persistent_ids,
            };
            let pump_task = tokio::spawn(pump.run(event_rx));

            let mut slot = self.client.lock().await;
            *slot = Some(ClientHandle {
                client,
                pump: pump_task,
            });
            drop(slot);

            self.store
                .set(KEY_SENDER_ID, serde_json::json!(sender_id))
                .map_err(ServiceError::storage)?;

            // Pre-rotation token; fresh registrations have none until the
            // client's first credential rotation arrives
            self.channel.send_event(HostEvent::new(
                EVENT_TOKEN_UPDATED,
                TokenUpdatedPayload {
                    token: token.clone(),
                },
            ));
        } else {
            log::debug!("Reusing stored push credentials for sender {}", sender_id);
        }

        Ok(token)
    }

    /// Overwrite the persisted credentials after a service-side rotation.
    ///
    /// The UI process is not notified; the next start command observes the
    /// new token.
    pub fn handle_credentials_changed(
        &self,
        new_credentials: Credentials,
    ) -> Result<(), ServiceError> {
        apply_credentials_changed(self.store.as_ref(), &new_credentials)
            .map_err(ServiceError::storage)
    }

    /// Record a delivered message id and forward the payload to the UI
    /// process if the host channel is still open.
    pub fn handle_notification(&self, message: PushMessage) -> Result<(), ServiceError> {
        apply_notification(
            self.store.as_ref(),
            self.channel.as_ref(),
            self.config.max_persistent_ids,
            &message,
        )
        .map_err(ServiceError::storage)
    }

    /// Clear all persisted registration state and tear down the live client.
    ///
    /// Idempotent; after a reset the next start command behaves like a fresh
    /// process. Push client teardown failures propagate to the caller.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        for key in [
            KEY_CREDENTIALS,
            KEY_SENDER_ID,
            KEY_PERSISTENT_IDS,
            KEY_CREDENTIALS_ROTATED_AT,
        ] {
            self.store.remove(key).map_err(ServiceError::storage)?;
        }

        self.started.store(false, Ordering::SeqCst);
        self.set_state(ServiceState::Unstarted);

        let handle = self.client.lock().await.take();
        if let Some(handle) = handle {
            handle.pump.abort();
            handle.client.teardown().await.map_err(ServiceError::Client)?;
            log::info!("Push client torn down");
        }

        Ok(())
    }

    /// Abort the pump and tear down any installed client, best effort
    async fn discard_client(&self) {
        let handle = self.client.lock().await.take();
        if let Some(handle) = handle {
            handle.pump.abort();
            if let Err(e) = handle.client.teardown().await {
                log::warn!("Push client teardown failed during cleanup: {}", e);
            }
        }
    }

    fn stored_credentials(&self) -> Result<Option<Credentials>, ServiceError> {
        let value = self
            .store
            .get(KEY_CREDENTIALS)
            .map_err(ServiceError::storage)?;
        Ok(value.map(Credentials))
    }

    fn stored_sender_id(&self) -> Result<Option<String>, ServiceError> {
        let value = self
            .store
            .get(KEY_SENDER_ID)
            .map_err(ServiceError::storage)?;
        Ok(value.and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    fn emit_started(&self, token: Option<String>) {
        self.channel.send_event(HostEvent::new(
            EVENT_SERVICE_STARTED,
            ServiceStartedPayload { token },
        ));
    }

    fn emit_error(&self, error: &ServiceError) {
        self.channel.send_event(HostEvent::new(
            EVENT_SERVICE_ERROR,
            ServiceErrorPayload {
                message: error.to_string(),
            },
        ));
    }

    fn set_state(&self, new_state: ServiceState) {
        *self.lock_state() = new_state;
    }

    fn lock_state(&self) -> MutexGuard<'_, ServiceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("State mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Drains push client events and applies them one at a time, preserving
/// arrival order
struct EventPump {
    store: Arc<dyn ConfigStore>,
    channel: Arc<dyn HostChannel>,
    max_persistent_ids: usize,
}

impl EventPump {
    async fn run(self, mut events: mpsc::UnboundedReceiver<PushClientEvent>) {
        while let Some(event) = events.recv().await {
            let result = match event {
                PushClientEvent::CredentialsChanged(credentials) => {
                    apply_credentials_changed(self.store.as_ref(), &credentials)
                }
                PushClientEvent::MessageReceived(message) => apply_notification(
                    self.store.as_ref(),
                    self.channel.as_ref(),
                    self.max_persistent_ids,
                    &message,
                ),
            };
            if let Err(e) = result {
                log::warn!("Failed to process push client event: {}", e);
            }
        }
        log::debug!("Push client event stream closed");
    }
}

/// Read the persisted dedup list, absent meaning empty
fn read_persistent_ids(store: &dyn ConfigStore) -> StoreResult<Vec<String>> {
    let Some(value) = store.get(KEY_PERSISTENT_IDS)? else {
        return Ok(Vec::new());
    };
    serde_json::from_value(value).map_err(|e| format!("Failed to parse persistentIds: {}", e))
}

fn apply_credentials_changed(
    store: &dyn ConfigStore,
    new_credentials: &Credentials,
) -> StoreResult<()> {
    log::info!("Push service reissued credentials, persisting");
    store.set(
        KEY_CREDENTIALS,
        serde_json::to_value(new_credentials)
            .map_err(|e| format!("Failed to serialize credentials: {}", e))?,
    )?;
    store.set(
        KEY_CREDENTIALS_ROTATED_AT,
        serde_json::json!(chrono::Utc::now().to_rfc3339()),
    )
}

fn apply_notification(
    store: &dyn ConfigStore,
    channel: &dyn HostChannel,
    max_persistent_ids: usize,
    message: &PushMessage,
) -> StoreResult<()> {
    let mut ids = read_persistent_ids(store)?;
    if !ids.iter().any(|id| id == &message.persistent_id) {
        ids.push(message.persistent_id.clone());
        // Oldest ids drop off first once the cap is reached
        if ids.len() > max_persistent_ids {
            let excess = ids.len() - max_persistent_ids;
            ids.drain(..excess);
        }
        store.set(KEY_PERSISTENT_IDS, serde_json::json!(ids))?;
    }

    if channel.is_open() {
        channel.send_event(HostEvent::new(
            EVENT_NOTIFICATION_RECEIVED,
            message.payload.clone(),
        ));
    } else {
        log::debug!(
            "Host channel closed, notification {} not forwarded",
            message.persistent_id
        );
    }

    Ok(())
}
