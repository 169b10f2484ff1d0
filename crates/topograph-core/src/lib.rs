//! topograph-core: Shared schema, record types, and configuration for Topograph.
//!
//! This crate provides the foundational types used across all Topograph components:
//! - Node kinds (Service, Database, QueueTopic, etc.) for the topology graph
//! - Edge kinds (calls, reads, dependson, etc.) for graph relationships
//! - Incoming agent records and their validated upsert forms
//! - The variant field registry for each kind
//! - Configuration management

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::TopographConfig;
pub use error::ValidationError;
pub use types::{
    Attributes, Edge, EdgeInput, EdgeKey, EdgeKind, EdgeUpsert, Node, NodeInput, NodeKind,
    NodeUpsert,
};
