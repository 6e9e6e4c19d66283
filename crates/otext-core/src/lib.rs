// File: `crates/otext-core/src/lib.rs`
//! # otext-core
//!
//! The operation algebra behind otext: a flat text edit is an ordered list of
//! `Retain`, `Insert` and `Delete` operations, and three functions act on it.
//!
//! - [`apply`] runs a list against a string
//! - [`transform`] reconciles two concurrent lists so that
//!   `apply(apply(s, a), b') == apply(apply(s, b), a')`
//! - [`compose`] folds two sequential lists into one equivalent list
//!
//! Everything here is pure and synchronous.
//!
//! ```rust
//! use otext_core::{apply, transform, OperationList};
//!
//! let alice = OperationList::new().retain(5).insert(",");
//! let bob = OperationList::new().retain(11).insert("!");
//!
//! let (bob2, alice2) = transform(&alice, &bob);
//! let left = apply(&apply("hello world", &alice).unwrap(), &bob2).unwrap();
//! let right = apply(&apply("hello world", &bob).unwrap(), &alice2).unwrap();
//! assert_eq!(left, "hello, world!");
//! assert_eq!(left, right);
//! ```

pub mod apply;
pub mod compose;
pub mod diff;
pub mod error;
pub mod operation;
pub mod transform;

pub use apply::apply;
pub use compose::compose;
pub use diff::diff;
pub use error::{OtError, Result};
pub use operation::{Operation, OperationKind, OperationList};
pub use transform::transform;
