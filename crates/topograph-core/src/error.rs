use thiserror::Error;

/// Rejection of an incoming record before it reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{record} record is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("unknown node kind '{0}'")]
    UnknownNodeKind(String),

    #[error("unknown edge kind '{0}'")]
    UnknownEdgeKind(String),

    #[error("malformed {record} record: {reason}")]
    Malformed {
        record: &'static str,
        reason: String,
    },
}
