//! topograph-ingest: batch ingestion and stale pruning for the Topograph graph.
//!
//! Agents report topology as batches of node and edge records. Each record is
//! validated and upserted independently, so one bad record never sinks the
//! rest of the batch. A background pruner removes nodes that agents have
//! stopped reporting.

pub mod batch;
pub mod error;
pub mod pruner;

pub use batch::{BatchReport, MutationEngine, TopologyUpdate};
pub use error::{IngestError, Result};
pub use pruner::{prune_stale, StalePruner};

use topograph_graph::GraphStore;

/// Close `store` whatever `outcome` was, so work applied before a failure
/// still reaches the snapshot. The command's own error wins over a close error.
pub fn close_after<T>(store: &GraphStore, outcome: error::Result<T>) -> error::Result<T> {
    let closed = store.close();
    let value = outcome?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use topograph_core::config::StoreConfig;
    use topograph_core::{NodeKind, NodeUpsert};

    #[test]
    fn test_close_after_failure_still_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            snapshot_path: Some(dir.path().join("graph.json")),
        };
        let store = GraphStore::open(&config).unwrap();
        let old = Utc::now() - TimeDelta::try_hours(48).unwrap();
        store
            .upsert_node(NodeUpsert::new("pod:old", NodeKind::Pod), old, "k8s")
            .unwrap();
        store
            .upsert_node(NodeUpsert::new("pod:new", NodeKind::Pod), Utc::now(), "k8s")
            .unwrap();

        // A prune lands, then the command fails afterwards.
        prune_stale(&store, Utc::now(), TimeDelta::try_hours(24).unwrap()).unwrap();
        let failed: error::Result<()> = Err(IngestError::Task("interrupted".into()));
        assert!(matches!(
            close_after(&store, failed),
            Err(IngestError::Task(_))
        ));
        assert!(!store.is_open());

        let reopened = GraphStore::open(&config).unwrap();
        assert!(reopened.contains_node("pod:new"));
        assert!(!reopened.contains_node("pod:old"));
    }

    #[test]
    fn test_close_after_success_returns_value() {
        let store = GraphStore::in_memory();
        assert_eq!(close_after(&store, Ok(7)).unwrap(), 7);
        assert!(!store.is_open());
    }
}
