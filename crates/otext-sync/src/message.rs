//! Values exchanged between clients and the server.

use otext_core::OperationList;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned document version.
pub type Revision = u64;

/// Identifier of one client (the author of a message).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh, time-ordered unique identifier.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One edit on the wire.
///
/// From a client, `revision` is the last server version it incorporated.
/// From the server, it is the version the edit produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub revision: Revision,
    pub author: ClientId,
    pub operations: OperationList,
}

impl Message {
    pub fn new(revision: Revision, author: ClientId, operations: OperationList) -> Self {
        Self {
            revision,
            author,
            operations,
        }
    }
}

/// Full document state at a revision, used to join or resynchronize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: Revision,
    pub text: String,
}

impl Snapshot {
    pub fn new(revision: Revision, text: impl Into<String>) -> Self {
        Self {
            revision,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn test_message_wire_format() {
        let message = Message::new(
            3,
            ClientId::new("alice"),
            OperationList::new().retain(5).insert(","),
        );
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(
            json,
            r#"{"revision":3,"author":"alice","operations":[{"retain":5},{"insert":","}]}"#
        );
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
