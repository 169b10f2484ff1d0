//! Read operations for the graph store.
//!
//! Every query copies what it needs out of the maps and releases the guard
//! before touching another map, so reads never block behind each other and
//! may observe concurrent upserts.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use topograph_core::{Edge, EdgeKey, EdgeKind, Node, NodeKind};

use crate::store::{GraphError, GraphStore};

/// Which side of a node's adjacency to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[serde(alias = "both")]
    Any,
}

/// An edge seen from one of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Neighbor {
    /// The node on the other end.
    pub id: String,
    /// The connecting edge, with its real direction.
    pub edge: EdgeKey,
}

impl GraphStore {
    // ── Counts ───────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.len()
    }

    // ── Node Lookups ─────────────────────────────────────────────

    /// Get a node by id.
    pub fn get_node(&self, id: &str) -> Result<Option<Node>, GraphError> {
        self.ensure_open()?;
        Ok(self.inner.nodes.get(id).map(|n| n.value().clone()))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.inner.nodes.contains_key(id)
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.nodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Ids of nodes of one kind, ascending.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .by_kind
            .get(&kind)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Ids of nodes with a given status, ascending.
    pub fn nodes_with_status(&self, status: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .by_status
            .get(status)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Full records of every node of one kind, ordered by id.
    pub fn list_nodes(&self, kind: NodeKind) -> Result<Vec<Node>, GraphError> {
        self.ensure_open()?;
        Ok(self
            .nodes_of_kind(kind)
            .into_iter()
            .filter_map(|id| self.inner.nodes.get(&id).map(|n| n.value().clone()))
            .collect())
    }

    /// Copy out several nodes, skipping ids that no longer exist.
    pub fn nodes_by_ids<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> Vec<Node> {
        ids.into_iter()
            .filter_map(|id| self.inner.nodes.get(id).map(|n| n.value().clone()))
            .collect()
    }

    // ── Edge Lookups ─────────────────────────────────────────────

    pub fn get_edge(&self, key: &EdgeKey) -> Option<Edge> {
        self.inner.edges.get(key).map(|e| e.value().clone())
    }

    /// Edges touching `id` on the given side, optionally restricted to some
    /// kinds. Sorted by neighbor id, then edge key.
    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        kinds: Option<&[EdgeKind]>,
    ) -> Vec<Neighbor> {
        let allowed = |kind: EdgeKind| kinds.map_or(true, |ks| ks.contains(&kind));

        let mut out = Vec::new();
        if let Some(adjacency) = self.inner.adjacency.get(id) {
            if matches!(direction, Direction::Outgoing | Direction::Any) {
                for (kind, targets) in adjacency.outgoing.iter().filter(|(k, _)| allowed(**k)) {
                    out.extend(targets.iter().map(|target| Neighbor {
                        id: target.clone(),
                        edge: EdgeKey {
                            source_id: id.to_string(),
                            target_id: target.clone(),
                            kind: *kind,
                        },
                    }));
                }
            }
            if matches!(direction, Direction::Incoming | Direction::Any) {
                for (kind, sources) in adjacency.incoming.iter().filter(|(k, _)| allowed(**k)) {
                    out.extend(sources.iter().map(|source| Neighbor {
                        id: source.clone(),
                        edge: EdgeKey {
                            source_id: source.clone(),
                            target_id: id.to_string(),
                            kind: *kind,
                        },
                    }));
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    /// Edges with both endpoints in `ids`, optionally restricted to some
    /// kinds. Sorted by edge key; parallel edges of different kinds are kept.
    pub fn induced_edges(&self, ids: &HashSet<String>, kinds: Option<&[EdgeKind]>) -> Vec<Edge> {
        let mut keys = BTreeSet::new();
        for id in ids {
            for neighbor in self.neighbors(id, Direction::Outgoing, kinds) {
                if ids.contains(&neighbor.id) {
                    keys.insert(neighbor.edge);
                }
            }
        }
        // An edge can vanish between the adjacency read and here; skip it.
        keys.iter().filter_map(|key| self.get_edge(key)).collect()
    }
}
