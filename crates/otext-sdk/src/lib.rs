//! otext SDK - async building blocks for collaborative plain-text editing
//!
//! This SDK runs the `otext-sync` state machines over an async transport:
//! a [`DocumentServer`] actor serializes every submission for one document,
//! and each [`Collaborator`] keeps a local replica that stays responsive
//! while its edits are in flight.
//!
//! # Architecture
//!
//! - [`client`] - Collaborator handle and its configuration
//! - [`server`] - Single-writer document server actor
//! - [`document`] - Local replica with change events
//! - [`network`] - Frames, the transport trait and an in-memory transport
//! - [`error`] - Error types
//!
//! # Frame flow
//!
//! ```text
//! Collaborator ── Hello ──────▶ DocumentServer
//!              ◀─ Welcome ────
//!              ── Submit ─────▶ Server::receive
//!              ◀─ Broadcast ── (to every member, the author included)
//!              ◀─ Rejected ─── (author only; the collaborator resyncs)
//! ```

pub mod client;
pub mod document;
pub mod error;
pub mod network;
pub mod server;

// Re-exports for convenience
pub use client::{ClientConfig, ClientConfigBuilder, Collaborator};
pub use document::{DocEvent, Document};
pub use error::{Result, SdkError};
pub use network::{create_star, EndpointId, Frame, MemoryTransport, NetworkError, Transport};
pub use server::{DocumentServer, ServerConfig, ServerConfigBuilder};

pub use otext_sync::{ClientId, ClientState, Message, OperationList, Revision, Snapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::{ClientConfig, Collaborator};
    pub use crate::document::DocEvent;
    pub use crate::error::SdkError;
    pub use crate::network::{EndpointId, MemoryTransport, Transport};
    pub use crate::server::{DocumentServer, ServerConfig};
}
