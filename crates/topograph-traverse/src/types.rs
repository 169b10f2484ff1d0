//! Request and response types for traversal operations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use topograph_core::{Attributes, Edge, EdgeKind, Node, NodeKind};
use topograph_graph::Direction;

use crate::error::{Result, TraversalError};

// ── Parameter bounds ─────────────────────────────────────────────

/// Default and inclusive range of one numeric query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub param: &'static str,
    pub default: usize,
    pub min: usize,
    pub max: usize,
}

impl Bound {
    /// `None` takes the default; an explicit value must lie in range.
    pub fn resolve(&self, value: Option<usize>) -> Result<usize> {
        match value {
            None => Ok(self.default),
            Some(v) if (self.min..=self.max).contains(&v) => Ok(v),
            Some(v) => Err(TraversalError::LimitExceeded {
                param: self.param,
                value: v,
                min: self.min,
                max: self.max,
            }),
        }
    }
}

pub const FULL_GRAPH_LIMIT: Bound = Bound {
    param: "limit",
    default: 500,
    min: 1,
    max: 5000,
};

pub const SUBGRAPH_DEPTH: Bound = Bound {
    param: "depth",
    default: 2,
    min: 1,
    max: 5,
};

pub const PATH_MAX_DEPTH: Bound = Bound {
    param: "max_depth",
    default: 5,
    min: 1,
    max: 10,
};

pub const IMPACT_DEPTH: Bound = Bound {
    param: "depth",
    default: 3,
    min: 1,
    max: 6,
};

pub const RULE_LIMIT: Bound = Bound {
    param: "limit",
    default: 200,
    min: 1,
    max: 5000,
};

pub const STEP_DEPTH: Bound = Bound {
    param: "step depth",
    default: 1,
    min: 1,
    max: 10,
};

pub const RULE_STEPS: Bound = Bound {
    param: "steps",
    default: 1,
    min: 1,
    max: 10,
};

// ── Requests ─────────────────────────────────────────────────────

/// Ego network around one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphRequest {
    pub center_node_id: String,
    /// Hops from the center (default: 2).
    #[serde(default)]
    pub depth: Option<usize>,
    /// Keep only visited nodes of these kinds.
    #[serde(default)]
    pub node_types: Option<Vec<NodeKind>>,
    /// Walk and return only edges of these kinds.
    #[serde(default)]
    pub edge_types: Option<Vec<EdgeKind>>,
}

/// Unweighted shortest path between two nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathRequest {
    pub source_id: String,
    pub target_id: String,
    /// Hop bound (default: 5).
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Which way impact propagates along edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDirection {
    /// Follow edges forward: what this node depends on.
    #[default]
    Downstream,
    /// Follow edges in reverse: what depends on this node.
    Upstream,
    /// Either edge direction at every hop.
    Both,
}

/// Directional reachability from one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactRequest {
    pub node_id: String,
    /// Hops from the node (default: 3).
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default)]
    pub direction: ImpactDirection,
}

/// One hop-range expansion of a rule frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalStep {
    /// Edge kinds to follow. Empty means every kind.
    #[serde(default)]
    pub edge_types: Vec<EdgeKind>,
    #[serde(default = "default_step_direction")]
    pub direction: Direction,
    /// Keep only reached nodes of these kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_types: Option<Vec<NodeKind>>,
    #[serde(default = "default_step_depth")]
    pub min_depth: usize,
    #[serde(default = "default_step_depth")]
    pub max_depth: usize,
}

impl TraversalStep {
    pub fn new(edge_types: Vec<EdgeKind>, direction: Direction) -> Self {
        Self {
            edge_types,
            direction,
            target_node_types: None,
            min_depth: 1,
            max_depth: 1,
        }
    }

    pub fn targets(mut self, kinds: Vec<NodeKind>) -> Self {
        self.target_node_types = Some(kinds);
        self
    }

    pub fn hops(mut self, min_depth: usize, max_depth: usize) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Edge kinds as a store filter; `None` when every kind is allowed.
    pub(crate) fn kind_filter(&self) -> Option<&[EdgeKind]> {
        if self.edge_types.is_empty() {
            None
        } else {
            Some(&self.edge_types)
        }
    }
}

fn default_step_direction() -> Direction {
    Direction::Outgoing
}

fn default_step_depth() -> usize {
    1
}

/// A multi-step exploration starting from one node or every node of some kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalRule {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seed node. Takes precedence over `start_node_types`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node_types: Option<Vec<NodeKind>>,
    pub steps: Vec<TraversalStep>,
    /// Maximum nodes in the result (default: 200).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

// ── Results ──────────────────────────────────────────────────────

/// A node as returned to query callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub status: String,
    pub environment: Option<String>,
    #[serde(default)]
    pub properties: Attributes,
}

impl From<Node> for GraphNode {
    fn from(node: Node) -> Self {
        let mut properties = node.attributes;
        if let Some(description) = node.description {
            properties.insert("description".into(), description.into());
        }
        if !node.tags.is_empty() {
            let tags = node
                .tags
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            properties.insert("tags".into(), serde_json::Value::Object(tags));
        }
        Self {
            id: node.id,
            kind: node.kind,
            name: node.name,
            status: node.status,
            environment: node.environment,
            properties,
        }
    }
}

/// An edge as returned to query callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub status: String,
    #[serde(default)]
    pub properties: Attributes,
}

impl From<Edge> for GraphEdge {
    fn from(edge: Edge) -> Self {
        Self {
            source_id: edge.source_id,
            target_id: edge.target_id,
            kind: edge.kind,
            status: edge.status,
            properties: edge.attributes,
        }
    }
}

/// Read-only result of every traversal mode.
///
/// Every edge's endpoints are among `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub node_count: usize,
    pub edge_count: usize,
}

impl GraphResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a result, dropping any edge whose endpoint is not in `nodes`.
    ///
    /// Nodes or edges removed between the walk and this copy simply vanish
    /// from the output instead of dangling.
    pub fn from_records(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let present: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges: Vec<GraphEdge> = edges
            .into_iter()
            .filter(|e| {
                present.contains(e.source_id.as_str()) && present.contains(e.target_id.as_str())
            })
            .map(GraphEdge::from)
            .collect();
        let nodes: Vec<GraphNode> = nodes.into_iter().map(GraphNode::from).collect();
        Self {
            node_count: nodes.len(),
            edge_count: edges.len(),
            nodes,
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}
