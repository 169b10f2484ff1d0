//! Write operations for the graph store.
//!
//! Every upsert is an atomic read-merge-write on one map entry, so writers to
//! different records proceed in parallel. Nodes are identified by id, edges
//! by (source, target, kind).

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use topograph_core::{Edge, EdgeKey, EdgeUpsert, Node, NodeUpsert};

use crate::store::{GraphError, GraphStore};

/// Whether an upsert created a record or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Counts from one stale-removal pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub nodes_removed: usize,
    pub edges_removed: usize,
}

impl GraphStore {
    // ── Upserts ──────────────────────────────────────────────────

    /// Create or merge a node.
    pub fn upsert_node(
        &self,
        upsert: NodeUpsert,
        now: DateTime<Utc>,
        source: &str,
    ) -> Result<UpsertOutcome, GraphError> {
        let _gate = self.inner.write_gate.read();
        self.ensure_open()?;

        match self.inner.nodes.entry(upsert.id.clone()) {
            Entry::Occupied(mut slot) => {
                let node = slot.get_mut();
                let (old_kind, old_status) = (node.kind, node.status.clone());
                node.merge(upsert, now, source);
                if node.kind != old_kind || node.status != old_status {
                    self.unindex_node(&node.id, old_kind, &old_status);
                    self.index_node(&node.id, node.kind, &node.status);
                }
                Ok(UpsertOutcome::Updated)
            }
            Entry::Vacant(slot) => {
                let node = Node::create(upsert, now, source);
                self.index_node(&node.id, node.kind, &node.status);
                tracing::debug!(id = %node.id, kind = %node.kind, "Created node");
                slot.insert(node);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Create or merge an edge. Fails with `NotFound` if either endpoint is absent.
    pub fn upsert_edge(
        &self,
        upsert: EdgeUpsert,
        now: DateTime<Utc>,
        source: &str,
    ) -> Result<UpsertOutcome, GraphError> {
        let _gate = self.inner.write_gate.read();
        self.ensure_open()?;

        for endpoint in [&upsert.source_id, &upsert.target_id] {
            if !self.inner.nodes.contains_key(endpoint.as_str()) {
                return Err(GraphError::NotFound {
                    id: endpoint.clone(),
                });
            }
        }

        let key = upsert.key();
        let outcome = match self.inner.edges.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().merge(upsert, now, source);
                UpsertOutcome::Updated
            }
            Entry::Vacant(slot) => {
                slot.insert(Edge::create(upsert, now, source));
                UpsertOutcome::Created
            }
        };

        if outcome == UpsertOutcome::Created {
            self.link(&key);
            tracing::debug!(edge = %key, "Created edge");
        }
        Ok(outcome)
    }

    // ── Stale Removal ────────────────────────────────────────────

    /// Remove every node last seen before `cutoff`, detaching its edges.
    ///
    /// Holds the write gate exclusively, so no upsert can attach a fresh edge
    /// to a node while it is being removed.
    pub fn remove_stale(&self, cutoff: DateTime<Utc>) -> Result<PruneReport, GraphError> {
        let _gate = self.inner.write_gate.write();
        self.ensure_open()?;

        let stale: Vec<String> = self
            .inner
            .nodes
            .iter()
            .filter(|entry| entry.last_seen_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        let mut report = PruneReport::default();
        for id in &stale {
            report.edges_removed += self.detach_delete(id);
            report.nodes_removed += 1;
        }

        if report.nodes_removed > 0 {
            tracing::info!(
                nodes_removed = report.nodes_removed,
                edges_removed = report.edges_removed,
                cutoff = %cutoff,
                "Removed stale nodes"
            );
        }
        Ok(report)
    }

    /// Remove a node, every edge touching it and its index entries.
    /// Returns the number of edges removed. Caller holds the exclusive gate.
    fn detach_delete(&self, id: &str) -> usize {
        let mut removed = 0;

        if let Some((_, adjacency)) = self.inner.adjacency.remove(id) {
            for (kind, targets) in adjacency.outgoing {
                for target in targets {
                    let key = EdgeKey {
                        source_id: id.to_string(),
                        target_id: target,
                        kind,
                    };
                    if self.inner.edges.remove(&key).is_some() {
                        removed += 1;
                    }
                    self.unlink_incoming(&key);
                }
            }
            for (kind, sources) in adjacency.incoming {
                for source in sources {
                    let key = EdgeKey {
                        source_id: source,
                        target_id: id.to_string(),
                        kind,
                    };
                    if self.inner.edges.remove(&key).is_some() {
                        removed += 1;
                    }
                    self.unlink_outgoing(&key);
                }
            }
        }

        if let Some((_, node)) = self.inner.nodes.remove(id) {
            self.unindex_node(&node.id, node.kind, &node.status);
        }
        removed
    }

    fn unlink_incoming(&self, key: &EdgeKey) {
        if let Some(mut adjacency) = self.inner.adjacency.get_mut(&key.target_id) {
            if let Some(sources) = adjacency.incoming.get_mut(&key.kind) {
                sources.remove(&key.source_id);
            }
        }
        self.inner
            .adjacency
            .remove_if(&key.target_id, |_, adjacency| adjacency.is_empty());
    }

    fn unlink_outgoing(&self, key: &EdgeKey) {
        if let Some(mut adjacency) = self.inner.adjacency.get_mut(&key.source_id) {
            if let Some(targets) = adjacency.outgoing.get_mut(&key.kind) {
                targets.remove(&key.target_id);
            }
        }
        self.inner
            .adjacency
            .remove_if(&key.source_id, |_, adjacency| adjacency.is_empty());
    }
}
