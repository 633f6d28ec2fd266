// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::needless_question_mark)] // Explicit ? can clarify error propagation

// Module declarations
pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod storage;

// Re-export the main surface for hosts
pub use channel::{EventBroadcaster, HostChannel};
pub use client::{Credentials, PushClient, PushClientEvent, PushConnector, PushMessage, Registration};
pub use commands::PushServiceState;
pub use config::{load_config, BridgeConfig};
pub use error::ServiceError;
pub use events::HostEvent;
pub use service::{NotificationService, ServiceState};
pub use storage::{ConfigStore, FileStore, MemoryStore};

/// Initialize logging from the environment (RUST_LOG).
///
/// Hosts embedding the bridge typically own logger setup; this helper exists
/// for standalone use and examples. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}
