//! Document server actor.
//!
//! One task drains the transport inbox and feeds every frame, in arrival
//! order, to the [`Server`] state machine. That task is the only writer;
//! the lock exists so observers can read the text and version meanwhile.

use crate::error::{Result, SdkError};
use crate::network::{EndpointId, Frame, Transport, DEFAULT_CHANNEL_CAPACITY};
use otext_sync::{Message, Revision, Server, Snapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for a document server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Name used in logs.
    pub document_id: String,
    /// Text at revision 0.
    pub initial_text: String,
    /// Inbox capacity for transports built from this config.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_id: "document".to_string(),
            initial_text: String::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for server configuration.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn document_id(mut self, id: impl Into<String>) -> Self {
        self.config.document_id = id.into();
        self
    }

    pub fn initial_text(mut self, text: impl Into<String>) -> Self {
        self.config.initial_text = text.into();
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves one document to every endpoint that sends `Hello`.
pub struct DocumentServer<T: Transport> {
    config: ServerConfig,
    transport: Arc<T>,
    state: RwLock<Server>,
    members: RwLock<Vec<EndpointId>>,
}

impl<T: Transport> DocumentServer<T> {
    pub fn new(config: ServerConfig, transport: Arc<T>) -> Self {
        let state = Server::new(config.initial_text.clone());
        Self {
            config,
            transport,
            state: RwLock::new(state),
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn version(&self) -> Revision {
        self.state.read().version()
    }

    pub fn text(&self) -> String {
        self.state.read().text().to_string()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.read().snapshot()
    }

    /// Copy of the accepted edits, oldest first.
    pub fn log(&self) -> Vec<Message> {
        self.state.read().log().to_vec()
    }

    /// Endpoints that have joined.
    pub fn members(&self) -> Vec<EndpointId> {
        self.members.read().clone()
    }

    /// Process frames until the inbox closes.
    pub async fn run(&self) -> Result<()> {
        let mut inbox = self.transport.subscribe()?;
        info!(document = %self.config.document_id, "document server started");

        while let Some((from, frame)) = inbox.recv().await {
            if let Err(e) = self.handle_frame(from.clone(), frame).await {
                warn!(document = %self.config.document_id, peer = %from, error = %e, "frame failed");
            }
        }

        info!(document = %self.config.document_id, "document server stopped");
        Ok(())
    }

    /// Handle one frame from `from`.
    pub async fn handle_frame(&self, from: EndpointId, frame: Frame) -> Result<()> {
        match frame {
            Frame::Hello { client_id } => {
                let snapshot = self.state.read().snapshot();
                {
                    let mut members = self.members.write();
                    if !members.contains(&from) {
                        members.push(from.clone());
                    }
                }
                info!(
                    document = %self.config.document_id,
                    client = %client_id,
                    revision = snapshot.revision,
                    "client joined"
                );
                self.transport.send(&from, Frame::Welcome(snapshot)).await?;
            }
            Frame::Submit(message) => {
                let author = message.author.clone();
                let accepted = self.state.write().receive(message);
                match accepted {
                    Ok(tagged) => self.broadcast(tagged).await,
                    Err(e) => {
                        warn!(
                            document = %self.config.document_id,
                            client = %author,
                            error = %e,
                            "submission rejected"
                        );
                        self.transport
                            .send(&from, Frame::Rejected { reason: e.to_string() })
                            .await?;
                        return Err(SdkError::Sync(e));
                    }
                }
            }
            other => {
                debug!(peer = %from, frame = ?other, "ignoring unexpected frame");
            }
        }
        Ok(())
    }

    /// Send an accepted edit to every member, the author included.
    async fn broadcast(&self, message: Message) {
        let members = self.members();
        let sends = members.iter().map(|member| {
            let frame = Frame::Broadcast(message.clone());
            async move { (member, self.transport.send(member, frame).await) }
        });

        for (member, result) in futures::future::join_all(sends).await {
            if let Err(e) = result {
                warn!(peer = %member, error = %e, "broadcast failed");
            }
        }
        debug!(version = message.revision, members = members.len(), "broadcast edit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::create_star;
    use otext_sync::{ClientId, OperationList};

    fn setup() -> (
        DocumentServer<crate::network::MemoryTransport>,
        Vec<crate::network::MemoryTransport>,
    ) {
        let (hub, spokes) = create_star("server", &["alice", "bob"], 16);
        let config = ServerConfigBuilder::new()
            .document_id("notes")
            .initial_text("hello world")
            .build();
        (DocumentServer::new(config, Arc::new(hub)), spokes)
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfigBuilder::new()
            .document_id("doc-1")
            .initial_text("abc")
            .channel_capacity(8)
            .build();

        assert_eq!(config.document_id, "doc-1");
        assert_eq!(config.initial_text, "abc");
        assert_eq!(config.channel_capacity, 8);
    }

    #[tokio::test]
    async fn test_hello_gets_welcome() {
        let (server, spokes) = setup();
        let mut inbox = spokes[0].subscribe().unwrap();

        server
            .handle_frame(
                EndpointId::new("alice"),
                Frame::Hello {
                    client_id: ClientId::new("alice"),
                },
            )
            .await
            .unwrap();

        let (_, frame) = inbox.recv().await.unwrap();
        assert_eq!(frame, Frame::Welcome(Snapshot::new(0, "hello world")));
        assert_eq!(server.members(), vec![EndpointId::new("alice")]);
    }

    #[tokio::test]
    async fn test_submit_is_broadcast_to_members_only() {
        let (server, spokes) = setup();
        let mut alice = spokes[0].subscribe().unwrap();
        let mut bob = spokes[1].subscribe().unwrap();

        let hello = Frame::Hello {
            client_id: ClientId::new("alice"),
        };
        server.handle_frame(EndpointId::new("alice"), hello).await.unwrap();
        let _welcome = alice.recv().await.unwrap();

        let submit = Frame::Submit(Message::new(
            0,
            ClientId::new("alice"),
            OperationList::new().retain(5).insert(","),
        ));
        server.handle_frame(EndpointId::new("alice"), submit).await.unwrap();

        let (_, frame) = alice.recv().await.unwrap();
        let Frame::Broadcast(message) = frame else {
            panic!("expected broadcast");
        };
        assert_eq!(message.revision, 1);
        assert!(bob.try_recv().is_err());
        assert_eq!(server.text(), "hello, world");
    }

    #[tokio::test]
    async fn test_failed_submit_is_rejected() {
        let (server, spokes) = setup();
        let mut alice = spokes[0].subscribe().unwrap();

        let submit = Frame::Submit(Message::new(
            4,
            ClientId::new("alice"),
            OperationList::new().insert("x"),
        ));
        let err = server
            .handle_frame(EndpointId::new("alice"), submit)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Sync(_)));

        let (_, frame) = alice.recv().await.unwrap();
        assert!(matches!(frame, Frame::Rejected { .. }));
        assert_eq!(server.version(), 0);
        assert!(server.log().is_empty());
    }
}
