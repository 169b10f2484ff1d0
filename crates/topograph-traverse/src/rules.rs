//! Multi-step rule execution.
//!
//! A rule seeds a frontier (one node, or every node of some kinds), then maps
//! it through each step in order. The retained set is the union of all
//! frontiers in discovery order, cut at the rule's limit.

use std::collections::{BTreeSet, HashSet};

use topograph_graph::GraphStore;

use crate::algorithms::reachable_in_range;
use crate::error::{Result, TraversalError};
use crate::types::{TraversalRule, TraversalStep, RULE_LIMIT, RULE_STEPS, STEP_DEPTH};

/// Check every numeric parameter of a rule before touching the store.
/// Returns the resolved node limit.
pub fn validate_rule(rule: &TraversalRule) -> Result<usize> {
    RULE_STEPS.resolve(Some(rule.steps.len()))?;
    for (index, step) in rule.steps.iter().enumerate() {
        STEP_DEPTH.resolve(Some(step.min_depth))?;
        STEP_DEPTH.resolve(Some(step.max_depth))?;
        if step.min_depth > step.max_depth {
            return Err(TraversalError::InvertedStep {
                index,
                min_depth: step.min_depth,
                max_depth: step.max_depth,
            });
        }
    }
    RULE_LIMIT.resolve(rule.limit)
}

/// Resolve the rule's seeds; unknown ids and empty kinds give no seeds.
fn seeds(store: &GraphStore, rule: &TraversalRule) -> BTreeSet<String> {
    if let Some(id) = &rule.start_node_id {
        return if store.contains_node(id) {
            BTreeSet::from([id.clone()])
        } else {
            BTreeSet::new()
        };
    }
    rule.start_node_types
        .iter()
        .flatten()
        .flat_map(|kind| store.nodes_of_kind(*kind))
        .collect()
}

fn apply_step(
    store: &GraphStore,
    frontier: &BTreeSet<String>,
    step: &TraversalStep,
) -> BTreeSet<String> {
    let reached = reachable_in_range(
        store,
        frontier,
        step.direction,
        step.kind_filter(),
        step.min_depth,
        step.max_depth,
    );
    match &step.target_node_types {
        Some(kinds) => {
            let allowed: HashSet<String> = kinds
                .iter()
                .flat_map(|kind| store.nodes_of_kind(*kind))
                .collect();
            reached.into_iter().filter(|id| allowed.contains(id)).collect()
        }
        None => reached,
    }
}

/// Node ids retained by `rule`, seeds first, at most `limit` of them.
///
/// Assumes the rule already passed [`validate_rule`].
pub fn collect_rule_nodes(store: &GraphStore, rule: &TraversalRule, limit: usize) -> Vec<String> {
    let mut frontier = seeds(store, rule);
    if frontier.is_empty() {
        return Vec::new();
    }

    let mut retained: Vec<String> = frontier.iter().cloned().collect();
    let mut seen: HashSet<String> = retained.iter().cloned().collect();

    for (index, step) in rule.steps.iter().enumerate() {
        if frontier.is_empty() {
            tracing::debug!(rule = %rule.name, step = index, "Frontier empty, stopping early");
            break;
        }
        frontier = apply_step(store, &frontier, step);
        for id in &frontier {
            if seen.insert(id.clone()) {
                retained.push(id.clone());
            }
        }
    }

    retained.truncate(limit);
    retained
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use topograph_core::{EdgeKind, EdgeUpsert, NodeKind, NodeUpsert};
    use topograph_graph::Direction;

    fn rule(steps: Vec<TraversalStep>) -> TraversalRule {
        TraversalRule {
            name: "test".into(),
            description: None,
            start_node_id: Some("api".into()),
            start_node_types: None,
            steps,
            limit: None,
        }
    }

    /// api -calls-> auth -reads-> users(Database); api -writes-> cache(Cache)
    fn build_graph() -> GraphStore {
        let store = GraphStore::in_memory();
        let now = Utc::now();
        for (id, kind) in [
            ("api", NodeKind::Service),
            ("auth", NodeKind::Service),
            ("users", NodeKind::Database),
            ("cache", NodeKind::Cache),
        ] {
            store.upsert_node(NodeUpsert::new(id, kind), now, "t").unwrap();
        }
        for (s, t, k) in [
            ("api", "auth", EdgeKind::Calls),
            ("auth", "users", EdgeKind::Reads),
            ("api", "cache", EdgeKind::Writes),
        ] {
            store.upsert_edge(EdgeUpsert::new(s, t, k), now, "t").unwrap();
        }
        store
    }

    #[test]
    fn test_validate_rule_bounds() {
        let any = rule(vec![TraversalStep::new(vec![], Direction::Any)]);
        assert_eq!(validate_rule(&any).unwrap(), 200);

        let deep = rule(vec![TraversalStep::new(vec![], Direction::Any).hops(1, 11)]);
        assert!(matches!(
            validate_rule(&deep),
            Err(TraversalError::LimitExceeded { value: 11, .. })
        ));

        let inverted = rule(vec![TraversalStep::new(vec![], Direction::Any).hops(3, 2)]);
        assert!(matches!(
            validate_rule(&inverted),
            Err(TraversalError::InvertedStep { index: 0, .. })
        ));

        assert!(validate_rule(&rule(vec![])).is_err());

        let mut big = rule(vec![TraversalStep::new(vec![], Direction::Any)]);
        big.limit = Some(5001);
        assert!(validate_rule(&big).is_err());
    }

    #[test]
    fn test_target_filter_applies_to_reached_nodes() {
        let store = build_graph();
        let r = rule(vec![TraversalStep::new(vec![], Direction::Outgoing)
            .hops(1, 2)
            .targets(vec![NodeKind::Database])]);
        assert_eq!(collect_rule_nodes(&store, &r, 200), vec!["api", "users"]);
    }

    #[test]
    fn test_empty_frontier_stops_early() {
        let store = build_graph();
        let r = rule(vec![
            TraversalStep::new(vec![EdgeKind::OwnedBy], Direction::Outgoing),
            TraversalStep::new(vec![], Direction::Any).hops(1, 5),
        ]);
        assert_eq!(collect_rule_nodes(&store, &r, 200), vec!["api"]);
    }

    #[test]
    fn test_start_by_kind_and_limit() {
        let store = build_graph();
        let mut r = rule(vec![TraversalStep::new(vec![EdgeKind::Reads], Direction::Outgoing)]);
        r.start_node_id = None;
        r.start_node_types = Some(vec![NodeKind::Service]);
        assert_eq!(collect_rule_nodes(&store, &r, 200), vec!["api", "auth", "users"]);
        assert_eq!(collect_rule_nodes(&store, &r, 2), vec!["api", "auth"]);

        r.start_node_types = None;
        assert!(collect_rule_nodes(&store, &r, 200).is_empty());
    }
}
