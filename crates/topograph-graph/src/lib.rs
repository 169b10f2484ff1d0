//! Topograph Graph: the indexed in-process property graph.
//!
//! This crate is the single owner of topology records. All reads and writes
//! flow through [`GraphStore`], which keeps the adjacency and kind/status
//! indices consistent with the node and edge maps and guarantees that no edge
//! outlives either of its endpoints.

pub mod mutations;
pub mod queries;
pub mod snapshot;
pub mod stats;
pub mod store;

pub use mutations::{PruneReport, UpsertOutcome};
pub use queries::{Direction, Neighbor};
pub use snapshot::Snapshot;
pub use stats::GraphStats;
pub use store::{GraphError, GraphStore};
