//! JSON snapshot persistence.
//!
//! Nodes are stored sorted by id and edges sorted by (source, target, kind);
//! each record carries its own identity fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use topograph_core::{Edge, Node};

use crate::store::GraphError;

/// On-disk form of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn read(path: &Path) -> Result<Self, GraphError> {
        let raw = std::fs::read(path).map_err(|e| {
            GraphError::Unavailable(format!("cannot read snapshot {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&raw).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// Write via a sibling temp file and rename, so readers never see a torn file.
    pub fn write(&self, path: &Path) -> Result<(), GraphError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body =
            serde_json::to_vec_pretty(self).map_err(|e| GraphError::Serialization(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use topograph_core::{EdgeKind, EdgeUpsert, NodeKind, NodeUpsert};

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let now = Utc::now();

        let snapshot = Snapshot {
            nodes: vec![
                Node::create(NodeUpsert::new("a", NodeKind::Service), now, "test"),
                Node::create(NodeUpsert::new("b", NodeKind::Database), now, "test"),
            ],
            edges: vec![Edge::create(EdgeUpsert::new("a", "b", EdgeKind::Reads), now, "test")],
        };
        snapshot.write(&path).unwrap();

        assert_eq!(Snapshot::read(&path).unwrap(), snapshot);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_read_garbage_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            Snapshot::read(&path),
            Err(GraphError::Serialization(_))
        ));
    }

    #[test]
    fn test_read_missing_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::read(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_retryable());
    }
}
