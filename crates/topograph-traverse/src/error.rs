//! Error types for the topograph-traverse crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraversalError {
    #[error("Graph error: {0}")]
    Graph(#[from] topograph_graph::GraphError),

    #[error("{param} = {value} is outside the allowed range {min}..={max}")]
    LimitExceeded {
        param: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("Invalid traversal step {index}: min_depth {min_depth} > max_depth {max_depth}")]
    InvertedStep {
        index: usize,
        min_depth: usize,
        max_depth: usize,
    },
}

pub type Result<T> = std::result::Result<T, TraversalError>;
