//! Sync-specific error types.

use thiserror::Error;

use super::operation_model::SyncDataType;

#[derive(Error, Debug)]
pub enum SyncError {
    /// No adapter is registered for the connection's platform.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Adapter-level credential failure; aborts the whole operation.
    #[error("Platform authentication failed: {0}")]
    Auth(String),

    /// `retry_count` reached `max_retries`; operator intervention required.
    #[error("Max retries exceeded for operation {operation_id} ({retry_count}/{max_retries})")]
    MaxRetriesExceeded {
        operation_id: String,
        retry_count: u32,
        max_retries: u32,
    },

    /// Single-flight violation: a non-terminal operation already exists
    /// for this connection and data type.
    #[error("Sync already in flight for connection {connection_id} ({data_type:?})")]
    OperationInFlight {
        connection_id: String,
        data_type: SyncDataType,
    },

    /// The operation id does not exist.
    #[error("Sync operation not found: {0}")]
    OperationNotFound(String),

    /// Attempted an invalid status transition.
    #[error("Invalid operation state: {0}")]
    InvalidState(String),
}
