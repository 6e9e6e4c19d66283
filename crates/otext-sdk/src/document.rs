//! Local replica of a shared document with change events.

use otext_core::diff;
use otext_sync::{
    Client, ClientId, ClientState, Message, OperationList, Received, Result, Revision, Snapshot,
};
use tokio::sync::broadcast;
use tracing::trace;

/// Events emitted when a document changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocEvent {
    /// A local edit was applied.
    LocalEdit { operations: OperationList },
    /// Another client's edit was applied, already transformed.
    RemoteEdit {
        revision: Revision,
        author: ClientId,
        operations: OperationList,
    },
    /// Our in-flight edit was accepted.
    Acknowledged { revision: Revision },
    /// Local state was replaced by a server snapshot.
    Resynced { revision: Revision },
    /// The server refused our submission.
    Rejected { reason: String },
}

/// A [`Client`] state machine that reports every change on a broadcast
/// channel.
pub struct Document {
    client: Client,
    event_tx: broadcast::Sender<DocEvent>,
}

impl Document {
    /// Create an empty, unjoined document.
    pub fn new(client_id: ClientId, event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            client: Client::new(client_id, Snapshot::new(0, "")),
            event_tx,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        self.client.id()
    }

    pub fn text(&self) -> &str {
        self.client.text()
    }

    pub fn version(&self) -> Revision {
        self.client.version()
    }

    pub fn state(&self) -> ClientState {
        self.client.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.event_tx.subscribe()
    }

    /// Replace the text with `text`, as reported by an editor.
    pub fn edit(&mut self, text: &str) -> Result<Option<Message>> {
        let ops = diff(self.client.text(), text);
        self.apply(ops)
    }

    /// Apply a local operation list.
    pub fn apply(&mut self, ops: OperationList) -> Result<Option<Message>> {
        let outgoing = self.client.apply_local(ops.clone())?;
        if ops.is_noop() {
            return Ok(None);
        }
        self.emit(DocEvent::LocalEdit { operations: ops });
        Ok(outgoing)
    }

    /// Handle a server broadcast; returns the buffered edit to send next,
    /// if an acknowledgement released one.
    ///
    /// Broadcasts at or below the local version were already folded into
    /// the last snapshot and are skipped.
    pub fn receive(&mut self, message: &Message) -> Result<Option<Message>> {
        if message.revision <= self.client.version() {
            trace!(revision = message.revision, "skipping stale broadcast");
            return Ok(None);
        }

        match self.client.receive(message)? {
            Received::Acknowledged { revision, next } => {
                self.emit(DocEvent::Acknowledged { revision });
                Ok(next)
            }
            Received::Remote { revision, applied } => {
                self.emit(DocEvent::RemoteEdit {
                    revision,
                    author: message.author.clone(),
                    operations: applied,
                });
                Ok(None)
            }
        }
    }

    pub fn resync(&mut self, snapshot: Snapshot) {
        let revision = snapshot.revision;
        self.client.resync(snapshot);
        self.emit(DocEvent::Resynced { revision });
    }

    pub fn reject(&mut self, reason: String) {
        self.emit(DocEvent::Rejected { reason });
    }

    fn emit(&self, event: DocEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
