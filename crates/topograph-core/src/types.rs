//! Core domain types for the Topograph service graph.
//!
//! Nodes and edges share a typed base record (identity, status, timestamps,
//! source attribution). Everything variant-specific or unrecognized lives in
//! an open attribute bag so new agent fields never need a schema change.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Open, string-keyed attribute bag carried by every node and edge.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Status assigned to records that never reported one.
pub const DEFAULT_STATUS: &str = "active";

/// Weight assigned to edges that never reported one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ── Node Kinds ────────────────────────────────────────────────────

/// The closed set of node variants in the topology graph.
///
/// Serialized with the names agents emit (`Node` for compute nodes,
/// `SLASLO` for service level objectives). Parsing is case-insensitive and
/// ignores `-`, `_` and spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeKind {
    Service,
    Endpoint,
    Deployment,
    Pod,
    ComputeNode,
    Database,
    Table,
    QueueTopic,
    Cache,
    ExternalApi,
    SecretConfig,
    Library,
    TeamOwner,
    Sla,
    RegionCluster,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Service,
        NodeKind::Endpoint,
        NodeKind::Deployment,
        NodeKind::Pod,
        NodeKind::ComputeNode,
        NodeKind::Database,
        NodeKind::Table,
        NodeKind::QueueTopic,
        NodeKind::Cache,
        NodeKind::ExternalApi,
        NodeKind::SecretConfig,
        NodeKind::Library,
        NodeKind::TeamOwner,
        NodeKind::Sla,
        NodeKind::RegionCluster,
    ];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Service => "Service",
            NodeKind::Endpoint => "Endpoint",
            NodeKind::Deployment => "Deployment",
            NodeKind::Pod => "Pod",
            NodeKind::ComputeNode => "Node",
            NodeKind::Database => "Database",
            NodeKind::Table => "Table",
            NodeKind::QueueTopic => "QueueTopic",
            NodeKind::Cache => "Cache",
            NodeKind::ExternalApi => "ExternalAPI",
            NodeKind::SecretConfig => "SecretConfig",
            NodeKind::Library => "Library",
            NodeKind::TeamOwner => "TeamOwner",
            NodeKind::Sla => "SLASLO",
            NodeKind::RegionCluster => "RegionCluster",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_kind(s).as_str() {
            "service" => Ok(NodeKind::Service),
            "endpoint" => Ok(NodeKind::Endpoint),
            "deployment" => Ok(NodeKind::Deployment),
            "pod" => Ok(NodeKind::Pod),
            "node" | "computenode" => Ok(NodeKind::ComputeNode),
            "database" => Ok(NodeKind::Database),
            "table" => Ok(NodeKind::Table),
            "queuetopic" => Ok(NodeKind::QueueTopic),
            "cache" => Ok(NodeKind::Cache),
            "externalapi" => Ok(NodeKind::ExternalApi),
            "secretconfig" => Ok(NodeKind::SecretConfig),
            "library" => Ok(NodeKind::Library),
            "teamowner" => Ok(NodeKind::TeamOwner),
            "slaslo" | "sla" => Ok(NodeKind::Sla),
            "regioncluster" => Ok(NodeKind::RegionCluster),
            _ => Err(ValidationError::UnknownNodeKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for NodeKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

// ── Edge Kinds ────────────────────────────────────────────────────

/// The closed set of relationship variants in the topology graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EdgeKind {
    Calls,
    PublishesTo,
    ConsumesFrom,
    Reads,
    Writes,
    DependsOn,
    DeployedOn,
    OwnedBy,
    AuthenticatesVia,
    RateLimitedBy,
    FailsOverTo,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 11] = [
        EdgeKind::Calls,
        EdgeKind::PublishesTo,
        EdgeKind::ConsumesFrom,
        EdgeKind::Reads,
        EdgeKind::Writes,
        EdgeKind::DependsOn,
        EdgeKind::DeployedOn,
        EdgeKind::OwnedBy,
        EdgeKind::AuthenticatesVia,
        EdgeKind::RateLimitedBy,
        EdgeKind::FailsOverTo,
    ];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "calls",
            EdgeKind::PublishesTo => "publishesto",
            EdgeKind::ConsumesFrom => "consumesfrom",
            EdgeKind::Reads => "reads",
            EdgeKind::Writes => "writes",
            EdgeKind::DependsOn => "dependson",
            EdgeKind::DeployedOn => "deployedon",
            EdgeKind::OwnedBy => "ownedby",
            EdgeKind::AuthenticatesVia => "authenticatesvia",
            EdgeKind::RateLimitedBy => "ratelimitedby",
            EdgeKind::FailsOverTo => "fails_over_to",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_kind(s).as_str() {
            "calls" => Ok(EdgeKind::Calls),
            "publishesto" => Ok(EdgeKind::PublishesTo),
            "consumesfrom" => Ok(EdgeKind::ConsumesFrom),
            "reads" => Ok(EdgeKind::Reads),
            "writes" => Ok(EdgeKind::Writes),
            "dependson" => Ok(EdgeKind::DependsOn),
            "deployedon" => Ok(EdgeKind::DeployedOn),
            "ownedby" => Ok(EdgeKind::OwnedBy),
            "authenticatesvia" => Ok(EdgeKind::AuthenticatesVia),
            "ratelimitedby" => Ok(EdgeKind::RateLimitedBy),
            "failsoverto" => Ok(EdgeKind::FailsOverTo),
            _ => Err(ValidationError::UnknownEdgeKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for EdgeKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EdgeKind> for String {
    fn from(kind: EdgeKind) -> Self {
        kind.as_str().to_string()
    }
}

fn normalize_kind(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Incoming Records ─────────────────────────────────────────────

/// A node as reported by an agent, before validation.
///
/// Only `id` and `type` are required; every field the base record does not
/// name is captured in `attributes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeInput {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// An edge as reported by an agent, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeInput {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub target_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// A validated node sighting. `None` fields leave stored values untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpsert {
    pub id: String,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub environment: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub attributes: Attributes,
}

impl NodeUpsert {
    /// A bare sighting carrying only identity.
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            description: None,
            status: None,
            environment: None,
            tags: None,
            attributes: Attributes::new(),
        }
    }
}

/// A validated edge sighting.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeUpsert {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    pub weight: Option<f64>,
    pub status: Option<String>,
    pub attributes: Attributes,
}

impl EdgeUpsert {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            weight: None,
            status: None,
            attributes: Attributes::new(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            kind: self.kind,
        }
    }
}

// ── Stored Records ───────────────────────────────────────────────

/// A node as held by the graph store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Node {
    /// Build a node from its first sighting.
    pub fn create(upsert: NodeUpsert, now: DateTime<Utc>, source: &str) -> Self {
        let NodeUpsert {
            id,
            kind,
            name,
            description,
            status,
            environment,
            tags,
            attributes,
        } = upsert;

        let mut node = Self {
            name: name.unwrap_or_else(|| id.clone()),
            id,
            kind,
            status: status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            environment,
            description,
            tags: tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            source: source.to_string(),
            attributes: Attributes::new(),
        };
        merge_attributes(&mut node.attributes, attributes);
        node
    }

    /// Shallow-merge a later sighting: present fields overwrite, absent
    /// fields are left as they were. `created_at` never moves.
    pub fn merge(&mut self, upsert: NodeUpsert, now: DateTime<Utc>, source: &str) {
        self.kind = upsert.kind;
        if let Some(name) = upsert.name {
            self.name = name;
        }
        if let Some(status) = upsert.status {
            self.status = status;
        }
        if upsert.environment.is_some() {
            self.environment = upsert.environment;
        }
        if upsert.description.is_some() {
            self.description = upsert.description;
        }
        if let Some(tags) = upsert.tags {
            self.tags = tags;
        }
        self.updated_at = now;
        self.last_seen_at = now;
        self.source = source.to_string();
        merge_attributes(&mut self.attributes, upsert.attributes);
    }
}

/// Identity of an edge: at most one edge per (source, target, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source_id, self.kind, self.target_id)
    }
}

/// An edge as held by the graph store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub weight: f64,
    pub status: String,
    pub source: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Edge {
    /// Build an edge from its first sighting.
    pub fn create(upsert: EdgeUpsert, now: DateTime<Utc>, source: &str) -> Self {
        let EdgeUpsert {
            source_id,
            target_id,
            kind,
            weight,
            status,
            attributes,
        } = upsert;

        let mut edge = Self {
            source_id,
            target_id,
            kind,
            first_seen: now,
            last_seen: now,
            weight: weight.unwrap_or(DEFAULT_WEIGHT),
            status: status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            source: source.to_string(),
            attributes: Attributes::new(),
        };
        merge_attributes(&mut edge.attributes, attributes);
        edge
    }

    /// Shallow-merge a later sighting. `first_seen` never moves.
    pub fn merge(&mut self, upsert: EdgeUpsert, now: DateTime<Utc>, source: &str) {
        if let Some(weight) = upsert.weight {
            self.weight = weight;
        }
        if let Some(status) = upsert.status {
            self.status = status;
        }
        self.last_seen = now;
        self.source = source.to_string();
        merge_attributes(&mut self.attributes, upsert.attributes);
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            kind: self.kind,
        }
    }
}

/// Key-by-key overwrite. Nulls are treated as absent.
fn merge_attributes(stored: &mut Attributes, incoming: Attributes) {
    for (key, value) in incoming {
        if value.is_null() {
            continue;
        }
        stored.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    #[test]
    fn test_node_kind_wire_names_roundtrip() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
        assert_eq!("ComputeNode".parse::<NodeKind>().unwrap(), NodeKind::ComputeNode);
        assert_eq!("sla".parse::<NodeKind>().unwrap(), NodeKind::Sla);
        assert_eq!("queue_topic".parse::<NodeKind>().unwrap(), NodeKind::QueueTopic);
        assert!("Widget".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_edge_kind_accepts_separators() {
        for kind in EdgeKind::ALL {
            assert_eq!(kind.as_str().parse::<EdgeKind>().unwrap(), kind);
        }
        assert_eq!("publishes-to".parse::<EdgeKind>().unwrap(), EdgeKind::PublishesTo);
        assert_eq!("DEPENDS_ON".parse::<EdgeKind>().unwrap(), EdgeKind::DependsOn);
        assert_eq!("fails-over-to".parse::<EdgeKind>().unwrap(), EdgeKind::FailsOverTo);
        assert_eq!(
            "nope".parse::<EdgeKind>(),
            Err(ValidationError::UnknownEdgeKind("nope".to_string()))
        );
    }

    #[test]
    fn test_kinds_serialize_as_wire_names() {
        assert_eq!(serde_json::to_value(NodeKind::Sla).unwrap(), json!("SLASLO"));
        assert_eq!(
            serde_json::to_value(EdgeKind::ConsumesFrom).unwrap(),
            json!("consumesfrom")
        );
        let kind: EdgeKind = serde_json::from_value(json!("rate-limited-by")).unwrap();
        assert_eq!(kind, EdgeKind::RateLimitedBy);
        assert!(serde_json::from_value::<NodeKind>(json!("Gadget")).is_err());
    }

    #[test]
    fn test_node_input_captures_unknown_fields() {
        let input: NodeInput = serde_json::from_value(json!({
            "id": "urn:service:payments",
            "type": "Service",
            "name": "payments",
            "language": "rust",
            "rps": 120.5
        }))
        .unwrap();

        assert_eq!(input.kind, "Service");
        assert_eq!(input.name.as_deref(), Some("payments"));
        assert_eq!(input.attributes.get("language"), Some(&json!("rust")));
        assert_eq!(input.attributes.get("rps"), Some(&json!(120.5)));
        assert!(!input.attributes.contains_key("id"));
    }

    #[test]
    fn test_node_create_defaults() {
        let now = Utc::now();
        let node = Node::create(NodeUpsert::new("urn:db:orders", NodeKind::Database), now, "agent");

        assert_eq!(node.name, "urn:db:orders");
        assert_eq!(node.status, DEFAULT_STATUS);
        assert_eq!(node.created_at, now);
        assert_eq!(node.last_seen_at, now);
        assert_eq!(node.source, "agent");
    }

    #[test]
    fn test_node_merge_is_shallow() {
        let t0 = Utc::now();
        let t1 = t0 + TimeDelta::try_minutes(5).unwrap();

        let mut first = NodeUpsert::new("urn:service:a", NodeKind::Service);
        first.environment = Some("prod".to_string());
        first.status = Some("degraded".to_string());
        first.attributes.insert("language".into(), json!("go"));
        first.attributes.insert("tier".into(), json!(1));
        let mut node = Node::create(first, t0, "otel");

        let mut second = NodeUpsert::new("urn:service:a", NodeKind::Service);
        second.attributes.insert("language".into(), json!("rust"));
        second.attributes.insert("framework".into(), json!("axum"));
        second.attributes.insert("tier".into(), serde_json::Value::Null);
        node.merge(second, t1, "k8s");

        assert_eq!(node.environment.as_deref(), Some("prod"));
        assert_eq!(node.status, "degraded");
        assert_eq!(node.attributes.get("language"), Some(&json!("rust")));
        assert_eq!(node.attributes.get("framework"), Some(&json!("axum")));
        assert_eq!(node.attributes.get("tier"), Some(&json!(1)));
        assert_eq!(node.created_at, t0);
        assert_eq!(node.updated_at, t1);
        assert_eq!(node.source, "k8s");
    }

    #[test]
    fn test_edge_merge_keeps_first_seen() {
        let t0 = Utc::now();
        let t1 = t0 + TimeDelta::try_seconds(30).unwrap();

        let mut up = EdgeUpsert::new("a", "b", EdgeKind::Calls);
        up.attributes.insert("protocol".into(), json!("grpc"));
        let mut edge = Edge::create(up, t0, "otel");
        assert_eq!(edge.weight, DEFAULT_WEIGHT);

        let mut again = EdgeUpsert::new("a", "b", EdgeKind::Calls);
        again.weight = Some(0.25);
        again.attributes.insert("rps".into(), json!(40));
        edge.merge(again, t1, "otel");

        assert_eq!(edge.first_seen, t0);
        assert_eq!(edge.last_seen, t1);
        assert_eq!(edge.weight, 0.25);
        assert_eq!(edge.attributes.get("protocol"), Some(&json!("grpc")));
        assert_eq!(edge.attributes.get("rps"), Some(&json!(40)));
        assert_eq!(edge.key().to_string(), "a -[calls]-> b");
    }
}
