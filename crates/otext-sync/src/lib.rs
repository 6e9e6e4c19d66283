//! # otext-sync
//!
//! The synchronization protocol built on the `otext-core` algebra.
//!
//! One authoritative [`Server`] owns the revision counter, the text and an
//! append-only log. Each [`Client`] keeps at most one edit in flight and
//! buffers everything typed meanwhile. Both are plain state machines: they
//! take a [`Message`] and return the messages to send, leaving I/O to the
//! caller.
//!
//! ```text
//! local edit ─▶ Client ─▶ channel ─▶ Server (apply or catch-up transform)
//!                                       │
//!         every Client ◀─ channel ◀─ broadcast (echo = acknowledgement)
//! ```
//!
//! [`Cluster`] wires one server and N clients together through ordered
//! in-memory queues for tests and demos.

pub mod client;
pub mod error;
pub mod message;
pub mod server;
pub mod simulation;

pub use client::{Client, ClientState, Received};
pub use error::{Result, SyncError};
pub use message::{ClientId, Message, Revision, Snapshot};
pub use server::Server;
pub use simulation::Cluster;

pub use otext_core::{Operation, OperationList};
