//! Client state machine.
//!
//! A client is in exactly one of three states, derived from its buffers:
//!
//! | state                | in flight | buffer |
//! |----------------------|-----------|--------|
//! | `Synchronized`       | none      | none   |
//! | `Awaiting`           | some      | none   |
//! | `AwaitingWithBuffer` | some      | some   |
//!
//! Only one edit is ever in flight. Edits made while waiting are composed
//! into the buffer, which is sent as a whole once the server echoes the
//! in-flight edit back.

use crate::error::{Result, SyncError};
use crate::message::{ClientId, Message, Revision, Snapshot};
use otext_core::{apply, compose, diff, transform, OperationList};
use tracing::{debug, trace};

/// Synchronization state of a [`Client`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientState {
    Synchronized,
    Awaiting,
    AwaitingWithBuffer,
}

/// What handling an incoming broadcast did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
    /// The server accepted our in-flight edit. `next` is the buffered edit
    /// that now has to be sent, if any.
    Acknowledged {
        revision: Revision,
        next: Option<Message>,
    },
    /// Another client's edit, as applied to the local text.
    Remote {
        revision: Revision,
        applied: OperationList,
    },
}

/// One participant's view of the shared document.
#[derive(Clone, Debug)]
pub struct Client {
    id: ClientId,
    version: Revision,
    text: String,
    in_flight: Option<OperationList>,
    buffer: Option<OperationList>,
}

impl Client {
    /// Start synchronized at a server snapshot.
    pub fn new(id: ClientId, snapshot: Snapshot) -> Self {
        Self {
            id,
            version: snapshot.revision,
            text: snapshot.text,
            in_flight: None,
            buffer: None,
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Last server revision incorporated into the local text.
    pub fn version(&self) -> Revision {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The sent but unacknowledged edit.
    pub fn in_flight(&self) -> Option<&OperationList> {
        self.in_flight.as_ref()
    }

    /// Local edits composed since the in-flight send.
    pub fn buffer(&self) -> Option<&OperationList> {
        self.buffer.as_ref()
    }

    pub fn state(&self) -> ClientState {
        match (&self.in_flight, &self.buffer) {
            (None, _) => ClientState::Synchronized,
            (Some(_), None) => ClientState::Awaiting,
            (Some(_), Some(_)) => ClientState::AwaitingWithBuffer,
        }
    }

    /// Record a local edit and apply it to the local text.
    ///
    /// Returns the message to send when the client was synchronized. Edits
    /// that change nothing are ignored.
    pub fn apply_local(&mut self, ops: OperationList) -> Result<Option<Message>> {
        let text = apply(&self.text, &ops)?;
        if ops.is_noop() {
            return Ok(None);
        }
        self.text = text;

        if self.in_flight.is_none() {
            debug!(client = %self.id, version = self.version, "sending edit");
            self.in_flight = Some(ops.clone());
            return Ok(Some(Message::new(self.version, self.id.clone(), ops)));
        }

        let buffer = match self.buffer.take() {
            Some(buffer) => compose(&buffer, &ops),
            None => ops,
        };
        self.buffer = (!buffer.is_noop()).then_some(buffer);
        trace!(client = %self.id, state = ?self.state(), "buffered edit");
        Ok(None)
    }

    /// Editor boundary: the editor reports the full text after a change.
    pub fn edit(&mut self, current: &str) -> Result<Option<Message>> {
        let ops = diff(&self.text, current);
        self.apply_local(ops)
    }

    /// Handle a broadcast from the server.
    pub fn receive(&mut self, message: &Message) -> Result<Received> {
        if message.author == self.id {
            self.acknowledge(message.revision)
        } else {
            self.apply_remote(message)
        }
    }

    fn acknowledge(&mut self, revision: Revision) -> Result<Received> {
        if self.in_flight.is_none() {
            return Err(SyncError::UnexpectedAcknowledgement {
                client: self.id.clone(),
            });
        }
        self.version = revision;
        self.in_flight = None;

        let next = self.buffer.take().map(|buffer| {
            self.in_flight = Some(buffer.clone());
            Message::new(self.version, self.id.clone(), buffer)
        });
        debug!(client = %self.id, revision, flushed = next.is_some(), "edit acknowledged");
        Ok(Received::Acknowledged { revision, next })
    }

    /// Transform a remote edit past the in-flight edit and then the buffer.
    /// The remote side goes first in each transform, as it does on the
    /// server where it already sits in the log.
    fn apply_remote(&mut self, message: &Message) -> Result<Received> {
        let mut remote = message.operations.clone();

        let in_flight = self.in_flight.as_ref().map(|in_flight| {
            let (in_flight, transformed) = transform(&remote, in_flight);
            remote = transformed;
            in_flight
        });
        let buffer = self.buffer.as_ref().map(|buffer| {
            let (buffer, transformed) = transform(&remote, buffer);
            remote = transformed;
            buffer
        });

        let text = apply(&self.text, &remote)?;

        self.text = text;
        self.in_flight = in_flight;
        self.buffer = buffer.filter(|buffer| !buffer.is_noop());
        self.version = message.revision;
        trace!(client = %self.id, revision = message.revision, state = ?self.state(), "applied remote edit");

        Ok(Received::Remote {
            revision: message.revision,
            applied: remote,
        })
    }

    /// Drop all pending work and adopt a fresh server snapshot.
    pub fn resync(&mut self, snapshot: Snapshot) {
        debug!(client = %self.id, revision = snapshot.revision, "resynchronizing");
        self.version = snapshot.revision;
        self.text = snapshot.text;
        self.in_flight = None;
        self.buffer = None;
    }
}
