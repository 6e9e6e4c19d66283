//! Collaborator handle: one editor session talking to a document server.

use crate::document::{DocEvent, Document};
use crate::error::{Result, SdkError};
use crate::network::{EndpointId, Frame, MemoryTransport, Transport};
use otext_sync::{ClientId, ClientState, Message, OperationList, Revision, Snapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

/// Configuration for a collaborator.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Display name, used in logs.
    pub user_name: String,
    /// Protocol identity. A fresh ULID is generated when unset.
    pub client_id: Option<ClientId>,
    /// Capacity of the [`DocEvent`] channel.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_name: "Anonymous".to_string(),
            client_id: None,
            event_capacity: 100,
        }
    }
}

/// Builder for client configuration.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.config.user_name = name.into();
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(ClientId::new(id));
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

type Inbox = Mutex<mpsc::Receiver<(EndpointId, Frame)>>;

/// A participant in a shared document.
///
/// Local edits go out through [`Collaborator::edit`]; incoming frames are
/// processed by [`Collaborator::run`] or one at a time with
/// [`Collaborator::next_frame`] and [`Collaborator::handle_frame`].
///
/// # Example
///
/// ```rust
/// use otext_sdk::{create_star, ClientConfig, Collaborator, DocumentServer, ServerConfig};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let (hub, mut spokes) = create_star("server", &["alice"], 16);
/// let server = Arc::new(DocumentServer::new(ServerConfig::default(), Arc::new(hub)));
/// let runner = server.clone();
/// let task = tokio::spawn(async move { runner.run().await });
///
/// let alice = Collaborator::new(
///     ClientConfig::default(),
///     otext_sdk::EndpointId::new("server"),
///     Arc::new(spokes.remove(0)),
/// )
/// .unwrap();
/// alice.join().await.unwrap();
/// alice.edit("Hello!").await.unwrap();
/// alice.sync_to(1).await.unwrap();
/// assert_eq!(server.text(), "Hello!");
/// task.abort();
/// # });
/// ```
pub struct Collaborator<T: Transport> {
    config: ClientConfig,
    server_id: EndpointId,
    transport: Arc<T>,
    document: RwLock<Document>,
    inbox: Inbox,
}

impl Collaborator<MemoryTransport> {
    /// Collaborator on a fresh memory transport linked to `server`.
    pub fn new_with_memory_transport(
        config: ClientConfig,
        server: &MemoryTransport,
    ) -> Result<Self> {
        let id = config
            .client_id
            .clone()
            .unwrap_or_else(ClientId::generate);
        let transport = MemoryTransport::new(EndpointId::new(id.as_str()));
        transport.connect_to(server);
        let config = ClientConfig {
            client_id: Some(id),
            ..config
        };
        Self::new(config, Transport::local_id(server).clone(), Arc::new(transport))
    }
}

impl<T: Transport> Collaborator<T> {
    /// Create a collaborator. Takes the transport's inbox.
    pub fn new(config: ClientConfig, server_id: EndpointId, transport: Arc<T>) -> Result<Self> {
        let inbox = transport.subscribe()?;
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(ClientId::generate);
        let document = Document::new(client_id, config.event_capacity);

        Ok(Self {
            config,
            server_id,
            transport,
            document: RwLock::new(document),
            inbox: Mutex::new(inbox),
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.document.read().client_id().clone()
    }

    pub fn user_name(&self) -> &str {
        &self.config.user_name
    }

    pub fn text(&self) -> String {
        self.document.read().text().to_string()
    }

    pub fn version(&self) -> Revision {
        self.document.read().version()
    }

    pub fn state(&self) -> ClientState {
        self.document.read().state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.document.read().subscribe()
    }

    /// Ask the server for a snapshot and wait for it.
    pub async fn join(&self) -> Result<Snapshot> {
        self.request_snapshot().await?;
        loop {
            let frame = self.next_frame().await?;
            if let Frame::Welcome(snapshot) = &frame {
                let snapshot = snapshot.clone();
                self.handle_frame(frame).await?;
                info!(user = %self.config.user_name, revision = snapshot.revision, "joined document");
                return Ok(snapshot);
            }
            self.handle_frame(frame).await?;
        }
    }

    /// Report the editor's full text after a local change.
    pub async fn edit(&self, text: &str) -> Result<()> {
        let outgoing = self.document.write().edit(text)?;
        self.submit(outgoing).await
    }

    /// Apply a local operation list.
    pub async fn apply(&self, ops: OperationList) -> Result<()> {
        let outgoing = self.document.write().apply(ops)?;
        self.submit(outgoing).await
    }

    /// Wait for the next frame from the server.
    pub async fn next_frame(&self) -> Result<Frame> {
        let mut inbox = self.inbox.lock().await;
        loop {
            match inbox.recv().await {
                Some((from, frame)) if from == self.server_id => return Ok(frame),
                Some((from, _)) => debug!(peer = %from, "ignoring frame from non-server peer"),
                None => return Err(SdkError::Closed),
            }
        }
    }

    /// Handle one frame from the server.
    ///
    /// A failing broadcast or a rejection triggers a resync request before
    /// the error is returned.
    pub async fn handle_frame(&self, frame: Frame) -> Result<()> {
        match frame {
            Frame::Welcome(snapshot) => {
                self.document.write().resync(snapshot);
                Ok(())
            }
            Frame::Broadcast(message) => {
                let received = self.document.write().receive(&message);
                match received {
                    Ok(next) => self.submit(next).await,
                    Err(e) => {
                        warn!(user = %self.config.user_name, error = %e, "broadcast failed, resyncing");
                        self.request_snapshot().await?;
                        Err(SdkError::Sync(e))
                    }
                }
            }
            Frame::Rejected { reason } => {
                warn!(user = %self.config.user_name, %reason, "submission rejected, resyncing");
                self.document.write().reject(reason.clone());
                self.request_snapshot().await?;
                Err(SdkError::Rejected(reason))
            }
            other => {
                debug!(frame = ?other, "ignoring unexpected frame");
                Ok(())
            }
        }
    }

    /// Process frames until `revision` has been incorporated.
    pub async fn sync_to(&self, revision: Revision) -> Result<()> {
        while self.version() < revision {
            let frame = self.next_frame().await?;
            self.handle_frame(frame).await?;
        }
        Ok(())
    }

    /// Process frames until every local edit has been acknowledged.
    pub async fn flush(&self) -> Result<()> {
        while self.state() != ClientState::Synchronized {
            let frame = self.next_frame().await?;
            self.handle_frame(frame).await?;
        }
        Ok(())
    }

    /// Process frames until the inbox closes.
    pub async fn run(&self) -> Result<()> {
        loop {
            let frame = match self.next_frame().await {
                Ok(frame) => frame,
                Err(SdkError::Closed) => return Ok(()),
                Err(e) => return Err(e),
            };
            if let Err(e) = self.handle_frame(frame).await {
                warn!(user = %self.config.user_name, error = %e, "frame failed");
            }
        }
    }

    async fn submit(&self, outgoing: Option<Message>) -> Result<()> {
        if let Some(message) = outgoing {
            debug!(user = %self.config.user_name, revision = message.revision, "submitting edit");
            self.transport
                .send(&self.server_id, Frame::Submit(message))
                .await?;
        }
        Ok(())
    }

    async fn request_snapshot(&self) -> Result<()> {
        let client_id = self.client_id();
        self.transport
            .send(&self.server_id, Frame::Hello { client_id })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfigBuilder::new()
            .user_name("Bob")
            .client_id("bob-1")
            .event_capacity(8)
            .build();

        assert_eq!(config.user_name, "Bob");
        assert_eq!(config.client_id, Some(ClientId::new("bob-1")));
        assert_eq!(config.event_capacity, 8);
    }

    #[test]
    fn test_generated_identity() {
        let server = MemoryTransport::new(EndpointId::new("server"));
        let alice = Collaborator::new_with_memory_transport(ClientConfig::default(), &server)
            .unwrap();

        assert_eq!(alice.client_id().as_str().len(), 26);
        assert_eq!(alice.user_name(), "Anonymous");
        assert_eq!(alice.state(), ClientState::Synchronized);
    }

    #[tokio::test]
    async fn test_edit_submits_to_server() {
        let server = MemoryTransport::new(EndpointId::new("server"));
        let mut server_inbox = server.subscribe().unwrap();
        let config = ClientConfigBuilder::new().client_id("alice").build();
        let alice = Collaborator::new_with_memory_transport(config, &server).unwrap();

        alice.edit("hi").await.unwrap();
        alice.edit("hi!").await.unwrap();

        let (from, frame) = server_inbox.recv().await.unwrap();
        assert_eq!(from, EndpointId::new("alice"));
        assert_eq!(
            frame,
            Frame::Submit(Message::new(
                0,
                ClientId::new("alice"),
                OperationList::new().insert("hi")
            ))
        );
        assert!(server_inbox.try_recv().is_err());
        assert_eq!(alice.state(), ClientState::AwaitingWithBuffer);
        assert_eq!(alice.text(), "hi!");
    }
}
