//! Deterministic in-memory cluster.
//!
//! One server and N clients joined by FIFO queues, one per direction per
//! client. Nothing moves until the caller delivers it, so tests can script
//! any interleaving the real channel allows (ordered, reliable, no
//! duplicates).

use crate::client::{Client, Received};
use crate::error::Result;
use crate::message::{ClientId, Message};
use crate::server::Server;
use otext_core::OperationList;
use std::collections::VecDeque;
use tracing::trace;

/// A server plus clients with ordered uplink and downlink queues.
#[derive(Debug)]
pub struct Cluster {
    server: Server,
    clients: Vec<Client>,
    /// client i -> server
    uplinks: Vec<VecDeque<Message>>,
    /// server -> client i
    downlinks: Vec<VecDeque<Message>>,
}

impl Cluster {
    /// Create a cluster of `n` clients named `client_0 .. client_{n-1}`.
    pub fn new(n: usize, text: impl Into<String>) -> Self {
        Self::with_names((0..n).map(|i| format!("client_{}", i)), text)
    }

    /// Create a cluster with one client per name.
    pub fn with_names<I, S>(names: I, text: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let server = Server::new(text);
        let clients: Vec<Client> = names
            .into_iter()
            .map(|name| Client::new(ClientId::new(name), server.snapshot()))
            .collect();
        let n = clients.len();

        Self {
            server,
            clients,
            uplinks: vec![VecDeque::new(); n],
            downlinks: vec![VecDeque::new(); n],
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn client(&self, idx: usize) -> &Client {
        &self.clients[idx]
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// Report the full editor text of client `idx` after a local change.
    pub fn edit(&mut self, idx: usize, text: &str) -> Result<()> {
        if let Some(message) = self.clients[idx].edit(text)? {
            self.uplinks[idx].push_back(message);
        }
        Ok(())
    }

    pub fn apply_local(&mut self, idx: usize, ops: OperationList) -> Result<()> {
        if let Some(message) = self.clients[idx].apply_local(ops)? {
            self.uplinks[idx].push_back(message);
        }
        Ok(())
    }

    /// Hand the oldest queued submission of client `idx` to the server and
    /// broadcast the result to every client. Returns false if the queue was
    /// empty.
    pub fn deliver_to_server(&mut self, idx: usize) -> Result<bool> {
        let Some(message) = self.uplinks[idx].pop_front() else {
            return Ok(false);
        };
        let tagged = self.server.receive(message)?;
        trace!(from = idx, version = tagged.revision, "broadcasting");
        for downlink in &mut self.downlinks {
            downlink.push_back(tagged.clone());
        }
        Ok(true)
    }

    /// Hand the oldest queued broadcast to client `idx`. A flushed buffer
    /// goes straight onto the uplink. Returns false if the queue was empty.
    pub fn deliver_to_client(&mut self, idx: usize) -> Result<bool> {
        let Some(message) = self.downlinks[idx].pop_front() else {
            return Ok(false);
        };
        if let Received::Acknowledged {
            next: Some(next), ..
        } = self.clients[idx].receive(&message)?
        {
            self.uplinks[idx].push_back(next);
        }
        Ok(true)
    }

    pub fn pending_to_server(&self, idx: usize) -> usize {
        self.uplinks[idx].len()
    }

    pub fn pending_to_client(&self, idx: usize) -> usize {
        self.downlinks[idx].len()
    }

    pub fn has_pending(&self) -> bool {
        self.uplinks
            .iter()
            .chain(self.downlinks.iter())
            .any(|queue| !queue.is_empty())
    }

    /// Deliver everything, round-robin, until all queues are empty.
    pub fn settle(&mut self) -> Result<()> {
        while self.has_pending() {
            for idx in 0..self.clients.len() {
                while self.deliver_to_server(idx)? {}
            }
            for idx in 0..self.clients.len() {
                while self.deliver_to_client(idx)? {}
            }
        }
        Ok(())
    }

    /// True when every client matches the server text and version.
    pub fn is_converged(&self) -> bool {
        self.clients.iter().all(|client| {
            client.text() == self.server.text() && client.version() == self.server.version()
        })
    }

    pub fn texts(&self) -> Vec<&str> {
        self.clients.iter().map(Client::text).collect()
    }
}
