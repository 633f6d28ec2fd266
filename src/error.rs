//! Error taxonomy for the notification service
//!
//! Every start-path failure is folded into a `push:service_error` event
//! carrying the display string; no structured codes cross the host channel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Stored credentials are present but unusable
    #[error("invalid push credentials: {0}")]
    InvalidCredentials(String),

    /// The push collaborator failed to register or connect
    #[error("push registration failed: {0}")]
    Registration(String),

    /// A live push client operation failed
    #[error("push client error: {0}")]
    Client(String),

    /// The persisted store could not be read or written
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Wrap a store-level error string
    pub fn storage(e: impl std::fmt::Display) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_message() {
        let err = ServiceError::Registration("sender rejected".to_string());
        assert_eq!(err.to_string(), "push registration failed: sender rejected");

        let err = ServiceError::storage("disk full");
        assert_eq!(err.to_string(), "storage error: disk full");
    }
}
