//! Conflict-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConflictError {
    /// The conflict id does not exist.
    #[error("Conflict not found: {0}")]
    NotFound(String),

    /// The conflict is already RESOLVED or IGNORED.
    #[error("Conflict {0} is already terminal")]
    AlreadyResolved(String),

    /// MANUAL_REVIEW is not a valid manual resolution choice.
    #[error("Strategy {0} cannot be applied as a manual resolution")]
    UnsupportedResolution(String),

    /// The conflict snapshot could not be interpreted.
    #[error("Invalid conflict snapshot: {0}")]
    InvalidSnapshot(String),
}
