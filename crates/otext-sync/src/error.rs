//! Error types for the synchronization layer.

use crate::message::{ClientId, Revision};
use otext_core::OtError;
use thiserror::Error;

/// Errors raised by the client and server state machines.
///
/// Every failing call leaves the state machine exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Ot(#[from] OtError),

    #[error("Revision {revision} is ahead of server version {current}")]
    OutOfRangeRevision { revision: Revision, current: Revision },

    #[error("Acknowledgement for {client} arrived with nothing in flight")]
    UnexpectedAcknowledgement { client: ClientId },

    #[error("No history recorded for revision {revision}")]
    UnknownRevision { revision: Revision },
}

pub type Result<T> = std::result::Result<T, SyncError>;
