//! Graph-wide counts by kind and status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use topograph_core::{EdgeKind, NodeKind};

use crate::store::{GraphError, GraphStore};

/// Counts keyed by wire name. Every kind of the closed sets is present,
/// including those with zero records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub edges_by_kind: BTreeMap<String, usize>,
    pub nodes_by_status: BTreeMap<String, usize>,
}

impl GraphStore {
    /// Aggregate counts. Totals are the sums of the per-kind counts, so they
    /// agree even if upserts land while the counts are taken.
    pub fn stats(&self) -> Result<GraphStats, GraphError> {
        self.ensure_open()?;

        let mut nodes_by_kind: BTreeMap<String, usize> = NodeKind::ALL
            .iter()
            .map(|k| (k.as_str().to_string(), 0))
            .collect();
        for entry in self.inner.by_kind.iter() {
            nodes_by_kind.insert(entry.key().as_str().to_string(), entry.value().len());
        }

        let mut edges_by_kind: BTreeMap<String, usize> = EdgeKind::ALL
            .iter()
            .map(|k| (k.as_str().to_string(), 0))
            .collect();
        for entry in self.inner.edges.iter() {
            *edges_by_kind
                .entry(entry.key().kind.as_str().to_string())
                .or_default() += 1;
        }

        let nodes_by_status = self
            .inner
            .by_status
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .filter(|(_, count)| *count > 0)
            .collect();

        Ok(GraphStats {
            total_nodes: nodes_by_kind.values().sum(),
            total_edges: edges_by_kind.values().sum(),
            nodes_by_kind,
            edges_by_kind,
            nodes_by_status,
        })
    }
}
