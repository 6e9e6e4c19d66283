//! The authoritative server.
//!
//! Submissions are handled one at a time. A submission made at the current
//! version applies directly; a stale one is first transformed against the
//! composition of every log entry the client has not seen yet.

use crate::error::{Result, SyncError};
use crate::message::{Message, Revision, Snapshot};
use otext_core::{apply, compose, transform, OperationList};
use tracing::{debug, info};

/// Server state: the version counter, the text and the log, owned as one unit.
#[derive(Clone, Debug, Default)]
pub struct Server {
    version: Revision,
    text: String,
    log: Vec<Message>,
}

impl Server {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            version: 0,
            text: text.into(),
            log: Vec::new(),
        }
    }

    pub fn version(&self) -> Revision {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Accepted edits, oldest first. Entry `i` produced version `i + 1`.
    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.version, self.text.clone())
    }

    /// Log entries a client at `revision` has not seen.
    pub fn history_since(&self, revision: Revision) -> Result<&[Message]> {
        if revision > self.version {
            return Err(SyncError::UnknownRevision { revision });
        }
        // The log has one entry per version, so the index always fits.
        Ok(&self.log[revision as usize..])
    }

    /// Everything that happened after `revision`, folded into one list.
    pub fn catch_up(&self, revision: Revision) -> Result<OperationList> {
        let history = self.history_since(revision)?;
        Ok(history.iter().fold(OperationList::new(), |acc, entry| {
            compose(&acc, &entry.operations)
        }))
    }

    /// Accept a submission and return the tagged message to broadcast to
    /// every attached client, the author included.
    pub fn receive(&mut self, message: Message) -> Result<Message> {
        if message.revision > self.version {
            return Err(SyncError::OutOfRangeRevision {
                revision: message.revision,
                current: self.version,
            });
        }

        let operations = if message.revision == self.version {
            message.operations
        } else {
            let behind = self.version - message.revision;
            let catch_up = self.catch_up(message.revision)?;
            debug!(
                author = %message.author,
                revision = message.revision,
                behind,
                "transforming stale submission"
            );
            transform(&catch_up, &message.operations).0
        };

        let text = apply(&self.text, &operations)?;

        self.text = text;
        self.version += 1;
        let tagged = Message::new(self.version, message.author, operations);
        self.log.push(tagged.clone());
        info!(author = %tagged.author, version = self.version, "accepted edit");

        Ok(tagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, Received};
    use crate::message::ClientId;

    fn submit(revision: Revision, author: &str, ops: OperationList) -> Message {
        Message::new(revision, ClientId::new(author), ops)
    }

    #[test]
    fn test_hello_world_scenario() {
        let mut server = Server::new("hello world");

        let first = server
            .receive(submit(
                0,
                "alice",
                OperationList::new().retain(5).insert(",").retain(6),
            ))
            .unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(server.text(), "hello, world");

        let second = server
            .receive(submit(0, "bob", OperationList::new().retain(11).insert("!")))
            .unwrap();
        assert_eq!(second.revision, 2);
        assert_eq!(server.text(), "hello, world!");
        assert_eq!(second.operations, OperationList::new().retain(12).insert("!"));
    }

    #[test]
    fn test_revision_ahead_is_rejected() {
        let mut server = Server::new("abc");
        let err = server
            .receive(submit(3, "alice", OperationList::new().insert("x")))
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::OutOfRangeRevision {
                revision: 3,
                current: 0
            }
        );
        assert_eq!(server.version(), 0);
        assert!(server.log().is_empty());
    }

    #[test]
    fn test_failed_apply_changes_nothing() {
        let mut server = Server::new("abc");
        let err = server
            .receive(submit(0, "alice", OperationList::new().retain(2).delete(5)))
            .unwrap_err();
        assert!(matches!(err, SyncError::Ot(_)));
        assert_eq!(server.text(), "abc");
        assert_eq!(server.version(), 0);
        assert!(server.log().is_empty());
    }

    #[test]
    fn test_history_since() {
        let mut server = Server::new("");
        server
            .receive(submit(0, "a", OperationList::new().insert("x")))
            .unwrap();
        server
            .receive(submit(1, "a", OperationList::new().insert("y")))
            .unwrap();

        assert_eq!(server.history_since(0).unwrap().len(), 2);
        assert_eq!(server.history_since(1).unwrap()[0].revision, 2);
        assert!(server.history_since(2).unwrap().is_empty());
        assert_eq!(
            server.history_since(3).unwrap_err(),
            SyncError::UnknownRevision { revision: 3 }
        );
    }

    #[test]
    fn test_catch_up_matches_peer_client() {
        // Log [A, B]; C was made at revision 0, concurrently with both.
        let base = "the quick fox";
        let mut server = Server::new(base);
        let a = OperationList::new().retain(4).delete(6).insert("slow ");
        let b = OperationList::new().retain(9).insert("brown ");
        let c = OperationList::new().retain(10).insert("red ").retain(3).insert("!");

        let mut peer = Client::new(ClientId::new("carol"), Snapshot::new(0, base));
        let sent = peer.apply_local(c).unwrap().unwrap();

        let tagged_a = server.receive(submit(0, "alice", a)).unwrap();
        let tagged_b = server.receive(submit(1, "alice", b)).unwrap();
        let tagged_c = server.receive(sent).unwrap();
        assert_eq!(tagged_c.revision, 3);

        assert!(matches!(peer.receive(&tagged_a).unwrap(), Received::Remote { .. }));
        assert!(matches!(peer.receive(&tagged_b).unwrap(), Received::Remote { .. }));
        assert_eq!(
            peer.receive(&tagged_c).unwrap(),
            Received::Acknowledged {
                revision: 3,
                next: None
            }
        );

        assert_eq!(peer.text(), server.text());
        assert_eq!(server.text(), "the slow brown red fox!");
    }

    #[test]
    fn test_snapshot_tracks_version() {
        let mut server = Server::new("ab");
        server
            .receive(submit(0, "a", OperationList::new().retain(2).insert("c")))
            .unwrap();
        assert_eq!(server.snapshot(), Snapshot::new(1, "abc"));
    }
}
