//! Network transport abstractions for otext synchronization.

use async_trait::async_trait;
use otext_sync::{ClientId, Message, Snapshot};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Default inbox capacity of a [`MemoryTransport`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Address of one transport endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl EndpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frames exchanged between collaborators and the document server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Frame {
    /// Join request; also used to ask for a fresh snapshot.
    Hello { client_id: ClientId },
    /// Server reply to `Hello`.
    Welcome(Snapshot),
    /// Client edit submission.
    Submit(Message),
    /// Accepted edit, sent to every member including its author.
    Broadcast(Message),
    /// A submission from this endpoint failed on the server.
    Rejected { reason: String },
}

impl Frame {
    /// Encode for a byte-oriented transport.
    pub fn encode(&self) -> Result<Vec<u8>, NetworkError> {
        serde_json::to_vec(self).map_err(|e| NetworkError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NetworkError> {
        serde_json::from_slice(bytes).map_err(|e| NetworkError::Codec(e.to_string()))
    }
}

/// Network error type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkError {
    PeerNotFound(String),
    SendFailed(String),
    AlreadySubscribed,
    Codec(String),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::PeerNotFound(id) => write!(f, "Peer not found: {}", id),
            NetworkError::SendFailed(e) => write!(f, "Send failed: {}", e),
            NetworkError::AlreadySubscribed => write!(f, "Inbox already taken"),
            NetworkError::Codec(e) => write!(f, "Codec error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Abstract transport.
///
/// Implementations must deliver frames between two endpoints in the order
/// they were sent, without loss or duplication.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Local address.
    fn local_id(&self) -> &EndpointId;

    /// Connect to a peer.
    async fn connect(&self, peer: &EndpointId) -> Result<(), NetworkError>;

    /// Disconnect from a peer.
    async fn disconnect(&self, peer: &EndpointId) -> Result<(), NetworkError>;

    /// Send a frame to a specific peer.
    async fn send(&self, peer: &EndpointId, frame: Frame) -> Result<(), NetworkError>;

    /// Send a frame to every connected peer.
    async fn broadcast(&self, frame: Frame) -> Result<(), NetworkError>;

    /// Currently connected peers.
    async fn connected_peers(&self) -> Vec<EndpointId>;

    /// Take the inbox. Only one subscriber is allowed.
    fn subscribe(&self) -> Result<mpsc::Receiver<(EndpointId, Frame)>, NetworkError>;
}

type SharedInbox = Arc<RwLock<Option<mpsc::Receiver<(EndpointId, Frame)>>>>;
type SharedOutgoing = Arc<RwLock<HashMap<EndpointId, mpsc::Sender<(EndpointId, Frame)>>>>;

/// In-memory transport for tests and simulation.
///
/// Every endpoint owns one bounded inbox; a peer link is a clone of the
/// peer's inbox sender, so frames between two endpoints stay FIFO.
pub struct MemoryTransport {
    local_id: EndpointId,
    inbox_tx: mpsc::Sender<(EndpointId, Frame)>,
    inbox_rx: SharedInbox,
    outgoing: SharedOutgoing,
}

impl MemoryTransport {
    pub fn new(local_id: EndpointId) -> Self {
        Self::with_capacity(local_id, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(local_id: EndpointId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            local_id,
            inbox_tx: tx,
            inbox_rx: Arc::new(RwLock::new(Some(rx))),
            outgoing: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Link two memory transports in both directions.
    pub fn connect_to(&self, other: &MemoryTransport) {
        self.outgoing
            .write()
            .insert(other.local_id.clone(), other.inbox_tx.clone());
        other
            .outgoing
            .write()
            .insert(self.local_id.clone(), self.inbox_tx.clone());
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_id(&self) -> &EndpointId {
        &self.local_id
    }

    /// Memory endpoints are linked with [`MemoryTransport::connect_to`];
    /// this only checks that the link exists.
    async fn connect(&self, peer: &EndpointId) -> Result<(), NetworkError> {
        if self.outgoing.read().contains_key(peer) {
            Ok(())
        } else {
            Err(NetworkError::PeerNotFound(peer.to_string()))
        }
    }

    async fn disconnect(&self, peer: &EndpointId) -> Result<(), NetworkError> {
        self.outgoing.write().remove(peer);
        Ok(())
    }

    async fn send(&self, peer: &EndpointId, frame: Frame) -> Result<(), NetworkError> {
        let tx = {
            let outgoing = self.outgoing.read();
            outgoing.get(peer).cloned()
        };

        match tx {
            Some(tx) => tx
                .send((self.local_id.clone(), frame))
                .await
                .map_err(|e| NetworkError::SendFailed(e.to_string())),
            None => Err(NetworkError::PeerNotFound(peer.to_string())),
        }
    }

    async fn broadcast(&self, frame: Frame) -> Result<(), NetworkError> {
        let senders: Vec<_> = {
            let outgoing = self.outgoing.read();
            outgoing
                .iter()
                .map(|(peer, tx)| (peer.clone(), tx.clone()))
                .collect()
        };

        for (peer, tx) in senders {
            if tx.send((self.local_id.clone(), frame.clone())).await.is_err() {
                warn!(from = %self.local_id, %peer, "broadcast skipped closed peer");
            }
        }
        Ok(())
    }

    async fn connected_peers(&self) -> Vec<EndpointId> {
        let mut peers: Vec<_> = self.outgoing.read().keys().cloned().collect();
        peers.sort();
        peers
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<(EndpointId, Frame)>, NetworkError> {
        self.inbox_rx
            .write()
            .take()
            .ok_or(NetworkError::AlreadySubscribed)
    }
}

/// Create a hub transport linked to one transport per spoke name.
///
/// Spokes are linked to the hub only, never to each other.
pub fn create_star(
    hub: &str,
    spokes: &[&str],
    capacity: usize,
) -> (MemoryTransport, Vec<MemoryTransport>) {
    let hub = MemoryTransport::with_capacity(EndpointId::new(hub), capacity);
    let spokes: Vec<_> = spokes
        .iter()
        .map(|name| MemoryTransport::with_capacity(EndpointId::new(*name), capacity))
        .collect();

    for spoke in &spokes {
        hub.connect_to(spoke);
    }

    (hub, spokes)
}
