//! topograph-traverse: read-only traversal over the Topograph graph store.
//!
//! Five modes, all bounded by depth/limit parameters and all returning a
//! [`GraphResult`] with no dangling edges:
//! full graph, subgraph (ego network), shortest path, directional impact and
//! multi-step rule traversal. Unknown subjects degrade to empty results;
//! only out-of-range parameters and store unavailability are errors.

pub mod algorithms;
pub mod blast;
pub mod error;
pub mod presets;
pub mod rules;
pub mod types;

pub use error::TraversalError;
pub use presets::{find_preset, preset_rules};
pub use types::{
    GraphEdge, GraphNode, GraphResult, ImpactDirection, ImpactRequest, PathRequest,
    SubgraphRequest, TraversalRule, TraversalStep,
};

use std::collections::HashSet;

use topograph_core::{EdgeKind, Node};
use topograph_graph::{Direction, GraphStats, GraphStore};

use crate::types::{FULL_GRAPH_LIMIT, IMPACT_DEPTH, PATH_MAX_DEPTH, SUBGRAPH_DEPTH};

/// The traversal engine. Holds a store handle and nothing else; every call
/// reads current store state.
#[derive(Debug, Clone)]
pub struct TraversalEngine {
    store: GraphStore,
}

impl TraversalEngine {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// The first `limit` nodes in id order (default: 500) plus their induced edges.
    pub fn full_graph(&self, limit: Option<usize>) -> error::Result<GraphResult> {
        let limit = FULL_GRAPH_LIMIT.resolve(limit)?;
        self.store.ensure_open()?;

        let ids: Vec<String> = self.store.node_ids().into_iter().take(limit).collect();
        Ok(self.materialize(&ids, None))
    }

    /// Ego network: every node within `depth` hops of the center in either
    /// direction, filtered by kind, plus the induced edges of allowed kinds.
    pub fn subgraph(&self, request: &SubgraphRequest) -> error::Result<GraphResult> {
        let depth = SUBGRAPH_DEPTH.resolve(request.depth)?;
        self.store.ensure_open()?;

        if !self.store.contains_node(&request.center_node_id) {
            return Ok(GraphResult::empty());
        }

        let edge_kinds = request.edge_types.as_deref();
        let walk = algorithms::bfs(
            &self.store,
            &[request.center_node_id.clone()],
            Direction::Any,
            edge_kinds,
            depth,
        );

        let mut ids = walk.order;
        if let Some(kinds) = &request.node_types {
            let allowed: HashSet<String> = kinds
                .iter()
                .flat_map(|kind| self.store.nodes_of_kind(*kind))
                .collect();
            ids.retain(|id| allowed.contains(id));
        }

        tracing::debug!(
            center = %request.center_node_id,
            depth,
            nodes = ids.len(),
            "Computed subgraph"
        );
        Ok(self.materialize(&ids, edge_kinds))
    }

    /// Min-hop path between two nodes ignoring direction (default bound: 5).
    /// Only the path's nodes and edges are returned.
    pub fn find_path(&self, request: &PathRequest) -> error::Result<GraphResult> {
        let max_depth = PATH_MAX_DEPTH.resolve(request.max_depth)?;
        self.store.ensure_open()?;

        let Some(path) = algorithms::shortest_path(
            &self.store,
            &request.source_id,
            &request.target_id,
            max_depth,
        ) else {
            return Ok(GraphResult::empty());
        };

        let nodes = self.store.nodes_by_ids(&path.nodes);
        let edges = path
            .edges
            .iter()
            .filter_map(|key| self.store.get_edge(key))
            .collect();
        Ok(GraphResult::from_records(nodes, edges))
    }

    /// Directional reachability from one node (default depth: 3).
    pub fn impact(&self, request: &ImpactRequest) -> error::Result<GraphResult> {
        let depth = IMPACT_DEPTH.resolve(request.depth)?;
        self.store.ensure_open()?;

        let walk = blast::compute_impact(&self.store, &request.node_id, depth, request.direction);
        let nodes = self.store.nodes_by_ids(&walk.order);
        let edges = walk
            .edges
            .iter()
            .filter_map(|key| self.store.get_edge(key))
            .collect();
        Ok(GraphResult::from_records(nodes, edges))
    }

    /// Run a multi-step rule. The result holds every frontier including the
    /// seeds, capped at the rule's limit (default: 200), with induced edges.
    pub fn execute_rule(&self, rule: &TraversalRule) -> error::Result<GraphResult> {
        let limit = rules::validate_rule(rule)?;
        self.store.ensure_open()?;

        let ids = rules::collect_rule_nodes(&self.store, rule, limit);
        tracing::debug!(rule = %rule.name, nodes = ids.len(), "Executed traversal rule");
        Ok(self.materialize(&ids, None))
    }

    pub fn stats(&self) -> error::Result<GraphStats> {
        Ok(self.store.stats()?)
    }

    pub fn get_node(&self, id: &str) -> error::Result<Option<Node>> {
        Ok(self.store.get_node(id)?)
    }

    /// Copy out `ids` (in order) and the induced edges among the nodes that
    /// still exist.
    fn materialize(
        &self,
        ids: &[String],
        edge_kinds: Option<&[EdgeKind]>,
    ) -> GraphResult {
        let nodes = self.store.nodes_by_ids(ids);
        let present: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let edges = self.store.induced_edges(&present, edge_kinds);
        GraphResult::from_records(nodes, edges)
    }
}
