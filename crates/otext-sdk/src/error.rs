//! Error types for the otext SDK.

use crate::network::NetworkError;
use otext_sync::SyncError;
use std::fmt;

/// Error type for SDK operations.
#[derive(Debug)]
pub enum SdkError {
    /// The protocol state machine refused a message.
    Sync(SyncError),
    /// The transport failed.
    Network(NetworkError),
    /// The server rejected a submission.
    Rejected(String),
    /// The inbox closed before the expected frame arrived.
    Closed,
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Sync(e) => write!(f, "Sync error: {}", e),
            SdkError::Network(e) => write!(f, "Network error: {}", e),
            SdkError::Rejected(reason) => write!(f, "Rejected by server: {}", reason),
            SdkError::Closed => write!(f, "Inbox closed"),
        }
    }
}

impl std::error::Error for SdkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SdkError::Sync(e) => Some(e),
            SdkError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for SdkError {
    fn from(e: SyncError) -> Self {
        SdkError::Sync(e)
    }
}

impl From<NetworkError> for SdkError {
    fn from(e: NetworkError) -> Self {
        SdkError::Network(e)
    }
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
