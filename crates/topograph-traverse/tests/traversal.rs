//! End-to-end traversal scenarios against a populated in-memory store.

use chrono::Utc;
use serde_json::json;

use topograph_core::{EdgeKind, EdgeUpsert, NodeKind, NodeUpsert};
use topograph_graph::{Direction, GraphStore};
use topograph_traverse::{
    find_preset, GraphResult, ImpactDirection, ImpactRequest, PathRequest, SubgraphRequest,
    TraversalEngine, TraversalError, TraversalRule, TraversalStep,
};

fn add_node(store: &GraphStore, id: &str, kind: NodeKind) {
    store
        .upsert_node(NodeUpsert::new(id, kind), Utc::now(), "test")
        .unwrap();
}

fn add_edge(store: &GraphStore, from: &str, to: &str, kind: EdgeKind) {
    store
        .upsert_edge(EdgeUpsert::new(from, to, kind), Utc::now(), "test")
        .unwrap();
}

/// A small shop:
///
/// ```text
/// web -calls-> checkout -calls-> payments -reads-> ledger(Database)
///                 |                  \-authenticatesvia-> stripe-key(SecretConfig)
///                 \-publishesto-> orders(QueueTopic) <-consumesfrom- fulfilment
/// payments -ownedby-> team-pay(TeamOwner); ledger -ownedby-> team-pay
/// ```
fn shop() -> TraversalEngine {
    let store = GraphStore::in_memory();
    for (id, kind) in [
        ("web", NodeKind::Service),
        ("checkout", NodeKind::Service),
        ("payments", NodeKind::Service),
        ("fulfilment", NodeKind::Service),
        ("ledger", NodeKind::Database),
        ("stripe-key", NodeKind::SecretConfig),
        ("orders", NodeKind::QueueTopic),
        ("team-pay", NodeKind::TeamOwner),
    ] {
        add_node(&store, id, kind);
    }
    for (from, to, kind) in [
        ("web", "checkout", EdgeKind::Calls),
        ("checkout", "payments", EdgeKind::Calls),
        ("payments", "ledger", EdgeKind::Reads),
        ("payments", "stripe-key", EdgeKind::AuthenticatesVia),
        ("checkout", "orders", EdgeKind::PublishesTo),
        ("fulfilment", "orders", EdgeKind::ConsumesFrom),
        ("payments", "team-pay", EdgeKind::OwnedBy),
        ("ledger", "team-pay", EdgeKind::OwnedBy),
    ] {
        add_edge(&store, from, to, kind);
    }
    TraversalEngine::new(store)
}

fn sorted_ids(result: &GraphResult) -> Vec<&str> {
    let mut ids = result.node_ids();
    ids.sort();
    ids
}

fn assert_no_dangling(result: &GraphResult) {
    for edge in &result.edges {
        assert!(result.contains_node(&edge.source_id), "dangling {edge:?}");
        assert!(result.contains_node(&edge.target_id), "dangling {edge:?}");
    }
    assert_eq!(result.node_count, result.nodes.len());
    assert_eq!(result.edge_count, result.edges.len());
}

#[test]
fn test_two_step_outgoing_rule() {
    let store = GraphStore::in_memory();
    add_node(&store, "a", NodeKind::Service);
    add_node(&store, "b", NodeKind::Service);
    add_node(&store, "d", NodeKind::Database);
    add_edge(&store, "a", "b", EdgeKind::Calls);
    add_edge(&store, "b", "d", EdgeKind::Reads);
    let engine = TraversalEngine::new(store);

    let rule = TraversalRule {
        name: "a downstream".into(),
        description: None,
        start_node_id: Some("a".into()),
        start_node_types: None,
        steps: vec![
            TraversalStep::new(vec![EdgeKind::Calls], Direction::Outgoing),
            TraversalStep::new(vec![EdgeKind::Reads], Direction::Outgoing),
        ],
        limit: None,
    };
    let result = engine.execute_rule(&rule).unwrap();

    assert_eq!(sorted_ids(&result), vec!["a", "b", "d"]);
    assert_eq!(result.edge_count, 2);
    assert_no_dangling(&result);
}

#[test]
fn test_unknown_center_gives_empty_subgraph() {
    let engine = shop();
    let result = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "urn:service:nowhere".into(),
            depth: Some(2),
            ..Default::default()
        })
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result, GraphResult::empty());
}

#[test]
fn test_subgraph_depth_and_filters() {
    let engine = shop();
    let one = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "payments".into(),
            depth: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        sorted_ids(&one),
        vec!["checkout", "ledger", "payments", "stripe-key", "team-pay"]
    );
    assert_no_dangling(&one);
    // ledger -ownedby-> team-pay is induced even though neither is the center.
    assert_eq!(one.edge_count, 5);

    let services_only = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "payments".into(),
            depth: Some(2),
            node_types: Some(vec![NodeKind::Service]),
            edge_types: None,
        })
        .unwrap();
    assert_eq!(sorted_ids(&services_only), vec!["checkout", "payments", "web"]);
    assert_no_dangling(&services_only);

    let calls_only = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "payments".into(),
            depth: Some(5),
            node_types: None,
            edge_types: Some(vec![EdgeKind::Calls]),
        })
        .unwrap();
    assert_eq!(sorted_ids(&calls_only), vec!["checkout", "payments", "web"]);
    assert!(calls_only.edges.iter().all(|e| e.kind == EdgeKind::Calls));

    let isolated = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "web".into(),
            depth: Some(2),
            node_types: None,
            edge_types: Some(vec![EdgeKind::FailsOverTo]),
        })
        .unwrap();
    assert_eq!(isolated.node_ids(), vec!["web"]);
}

#[test]
fn test_subgraph_depth_out_of_bounds() {
    let engine = shop();
    let err = engine
        .subgraph(&SubgraphRequest {
            center_node_id: "payments".into(),
            depth: Some(6),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        TraversalError::LimitExceeded {
            param: "depth",
            value: 6,
            min: 1,
            max: 5
        }
    ));
}

#[test]
fn test_find_path_across_directions() {
    let engine = shop();
    let result = engine
        .find_path(&PathRequest {
            source_id: "web".into(),
            target_id: "fulfilment".into(),
            max_depth: None,
        })
        .unwrap();
    assert_eq!(
        result.node_ids(),
        vec!["web", "checkout", "orders", "fulfilment"]
    );
    assert_eq!(result.edge_count, 3);
    assert_no_dangling(&result);

    let too_short = engine
        .find_path(&PathRequest {
            source_id: "web".into(),
            target_id: "fulfilment".into(),
            max_depth: Some(2),
        })
        .unwrap();
    assert!(too_short.is_empty());

    assert!(engine
        .find_path(&PathRequest {
            source_id: "web".into(),
            target_id: "ghost".into(),
            max_depth: None,
        })
        .unwrap()
        .is_empty());

    assert!(matches!(
        engine.find_path(&PathRequest {
            source_id: "web".into(),
            target_id: "ledger".into(),
            max_depth: Some(11),
        }),
        Err(TraversalError::LimitExceeded { .. })
    ));
}

#[test]
fn test_impact_directions() {
    let engine = shop();
    let impact = |direction| {
        engine
            .impact(&ImpactRequest {
                node_id: "payments".into(),
                depth: None,
                direction,
            })
            .unwrap()
    };

    let down = impact(ImpactDirection::Downstream);
    assert_eq!(
        sorted_ids(&down),
        vec!["ledger", "payments", "stripe-key", "team-pay"]
    );
    assert_no_dangling(&down);

    let up = impact(ImpactDirection::Upstream);
    assert_eq!(sorted_ids(&up), vec!["checkout", "payments", "web"]);
    assert_eq!(up.edge_count, 2);

    let both = impact(ImpactDirection::Both);
    // fulfilment is three hops out: payments <- checkout -> orders <- fulfilment.
    assert_eq!(
        sorted_ids(&both),
        vec![
            "checkout",
            "fulfilment",
            "ledger",
            "orders",
            "payments",
            "stripe-key",
            "team-pay",
            "web"
        ]
    );
    assert_eq!(both.edge_count, 8);
    assert_no_dangling(&both);
}

#[test]
fn test_rule_hop_range_counts_paths_not_bounces() {
    let store = GraphStore::in_memory();
    add_node(&store, "x", NodeKind::Service);
    add_node(&store, "hub", NodeKind::Service);
    add_edge(&store, "x", "hub", EdgeKind::Calls);
    let engine = TraversalEngine::new(store);

    let rule = TraversalRule {
        name: "two to three hops".into(),
        description: None,
        start_node_id: Some("x".into()),
        start_node_types: None,
        steps: vec![TraversalStep::new(vec![], Direction::Any).hops(2, 3)],
        limit: None,
    };
    let result = engine.execute_rule(&rule).unwrap();
    assert_eq!(result.node_ids(), vec!["x"]);
    assert_eq!(result.edge_count, 0);
}

#[test]
fn test_preset_with_start_node() {
    let engine = shop();
    let mut rule = find_preset("Service → Downstream → Data Stores").unwrap();
    rule.start_node_id = Some("web".into());

    let result = engine.execute_rule(&rule).unwrap();
    assert_eq!(
        sorted_ids(&result),
        vec!["checkout", "ledger", "payments", "web"]
    );
    assert_no_dangling(&result);
}

#[test]
fn test_topic_preset_walks_incoming_consumers() {
    let engine = shop();
    let rule = find_preset("Topic → Consumers → Downstream").unwrap();
    let result = engine.execute_rule(&rule).unwrap();
    assert_eq!(sorted_ids(&result), vec!["fulfilment", "orders"]);
    assert_eq!(result.edges[0].kind, EdgeKind::ConsumesFrom);
}

#[test]
fn test_rule_limit_caps_seeds_first() {
    let engine = shop();
    let rule: TraversalRule = serde_json::from_value(json!({
        "name": "all services then anything",
        "start_node_types": ["Service"],
        "steps": [{"edge_types": [], "direction": "any", "max_depth": 3}],
        "limit": 4
    }))
    .unwrap();
    let result = engine.execute_rule(&rule).unwrap();
    assert_eq!(
        result.node_ids(),
        vec!["checkout", "fulfilment", "payments", "web"]
    );
    assert_no_dangling(&result);
}

#[test]
fn test_full_graph_and_stats_agree() {
    let engine = shop();
    let full = engine.full_graph(None).unwrap();
    let stats = engine.stats().unwrap();
    assert_eq!(full.node_count, stats.total_nodes);
    assert_eq!(full.edge_count, stats.total_edges);
    assert_eq!(stats.nodes_by_kind["Service"], 4);
    assert_eq!(stats.edges_by_kind["ownedby"], 2);
}

#[test]
fn test_result_serializes_with_wire_names() {
    let engine = shop();
    let result = engine
        .find_path(&PathRequest {
            source_id: "payments".into(),
            target_id: "ledger".into(),
            max_depth: Some(1),
        })
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["node_count"], 2);
    assert_eq!(value["edges"][0]["type"], "reads");
    assert_eq!(value["nodes"][0]["type"], "Service");
    assert_eq!(value["nodes"][1]["type"], "Database");
}
