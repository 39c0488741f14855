//! Persistent, hash-consed hypertrie.
//!
//! A hypertrie stores a sparse relation of fixed depth `d`: a map from keys
//! of `d` key parts to non-zero values. Each node is indexed along every key
//! position at once, so fixing any subset of positions (slicing) or asking
//! which key parts several positions share (diagonals) is a descent, not a
//! scan.
//!
//! # Key properties
//!
//! - **Content addressing**: every node is stored under an [`Identifier`]
//!   computed from its entries, so equal sub-relations are one physical node
//!   across all hypertries of a [`HypertrieContext`]
//! - **Incremental hashing**: identifiers are XOR sums of entry hashes and
//!   are updated per entry, never recomputed
//! - **Reference counting**: nodes are freed exactly when the last
//!   reference goes away, releasing their children
//! - **Batched updates**: inserts and erases are planned per depth
//!   (requests, plan, apply), so shared structure is copied, moved, or
//!   deleted once per batch
//! - **Zero `unsafe`**: enforced by `#![forbid(unsafe_code)]`
//!
//! # Layers
//!
//! - [`Hypertrie`]: validated, reference-owning handle
//! - [`NodeContext`]: raw façade over the [`NodeStore`](store::NodeStore),
//!   exchanging [`NodeContainer`]s and trusting its caller

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod bulk;
pub mod config;
pub mod diagonal;
pub mod error;
pub mod identifier;
pub mod iter;
pub mod key;
pub mod node;
pub mod ops;
pub mod store;
pub mod value;

mod context;
mod hypertrie;

#[cfg(test)]
mod tests;

pub use bulk::{BulkMode, BulkStats, BulkUpdater, BulkUpdaterSettings, bulk_update_async};
pub use config::MAX_DEPTH;
pub use context::NodeContext;
pub use error::HypertrieError;
pub use hypertrie::{HashDiagonal, Hypertrie, HypertrieContext, SliceOutcome};
pub use identifier::Identifier;
pub use key::{RawKey, SingleEntry};
pub use node::{NodeContainer, NodeRef};
pub use ops::slice::SliceResult;
pub use value::{KeyPart, Value};
