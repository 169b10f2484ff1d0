//! Built-in traversal rules offered to callers as templates.

use topograph_core::{EdgeKind, NodeKind};
use topograph_graph::Direction;

use crate::types::{TraversalRule, TraversalStep};

fn preset(
    name: &str,
    description: &str,
    start: Option<Vec<NodeKind>>,
    steps: Vec<TraversalStep>,
    limit: usize,
) -> TraversalRule {
    TraversalRule {
        name: name.to_string(),
        description: Some(description.to_string()),
        start_node_id: None,
        start_node_types: start,
        steps,
        limit: Some(limit),
    }
}

/// The preset library. Callers typically set `start_node_id` before running one.
pub fn preset_rules() -> Vec<TraversalRule> {
    use Direction::{Incoming, Outgoing};
    use EdgeKind::*;

    vec![
        preset(
            "Service → Downstream → Data Stores",
            "Follow calls/dependson from a service to its downstream services, then to databases and caches",
            Some(vec![NodeKind::Service]),
            vec![
                TraversalStep::new(vec![Calls, DependsOn], Outgoing)
                    .targets(vec![NodeKind::Service, NodeKind::ExternalApi])
                    .hops(1, 3),
                TraversalStep::new(vec![Reads, Writes], Outgoing)
                    .targets(vec![NodeKind::Database, NodeKind::Cache, NodeKind::Table]),
            ],
            200,
        ),
        preset(
            "Topic → Consumers → Downstream",
            "From a queue topic, find consumers and their downstream dependencies",
            Some(vec![NodeKind::QueueTopic]),
            vec![
                TraversalStep::new(vec![ConsumesFrom], Incoming).targets(vec![NodeKind::Service]),
                TraversalStep::new(vec![Calls, DependsOn, Writes, Reads], Outgoing).hops(1, 2),
            ],
            200,
        ),
        preset(
            "Team Ownership",
            "All resources owned by a team and their dependencies",
            Some(vec![NodeKind::TeamOwner]),
            vec![
                TraversalStep::new(vec![OwnedBy], Incoming)
                    .targets(vec![NodeKind::Service, NodeKind::Database]),
                TraversalStep::new(vec![Calls, DependsOn, Reads, Writes, PublishesTo], Outgoing)
                    .hops(1, 2),
            ],
            300,
        ),
        preset(
            "Infrastructure: Service → Deploy → Cluster",
            "Trace from services through deployments to infrastructure nodes",
            Some(vec![NodeKind::Service]),
            vec![
                TraversalStep::new(vec![DeployedOn], Incoming).targets(vec![NodeKind::Deployment]),
                TraversalStep::new(vec![DeployedOn], Outgoing)
                    .targets(vec![NodeKind::RegionCluster, NodeKind::ComputeNode])
                    .hops(1, 2),
            ],
            200,
        ),
        preset(
            "Security: Auth Chain",
            "Show how services authenticate through secrets and configs",
            Some(vec![NodeKind::Service]),
            vec![TraversalStep::new(vec![AuthenticatesVia], Outgoing)
                .targets(vec![NodeKind::SecretConfig])],
            100,
        ),
        preset(
            "Full Dependency Tree",
            "Recursive downstream dependency tree from a service, including all resource types",
            None,
            vec![TraversalStep::new(
                vec![Calls, DependsOn, Reads, Writes, PublishesTo, ConsumesFrom],
                Outgoing,
            )
            .hops(1, 5)],
            500,
        ),
    ]
}

/// Look a preset up by exact or case-insensitive name.
pub fn find_preset(name: &str) -> Option<TraversalRule> {
    preset_rules()
        .into_iter()
        .find(|rule| rule.name.eq_ignore_ascii_case(name))
}
