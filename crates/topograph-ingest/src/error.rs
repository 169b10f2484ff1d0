//! Error types for the topograph-ingest crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Graph error: {0}")]
    Graph(#[from] topograph_graph::GraphError),

    #[error("Invalid batch JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pruner task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
