//! Impact (blast radius) computation.
//!
//! BFS from one node along edge direction (downstream), against it
//! (upstream), or ignoring it (both). Each hop of a "both" walk may take an
//! edge either way, so a zig-zag such as a -> b <- c reaches c.

use topograph_graph::{Direction, GraphStore};

use crate::algorithms::{bfs, Walk};
use crate::types::ImpactDirection;

/// Everything reachable from `node_id` within `max_hops` in `direction`.
///
/// The node itself is always included. `order` is sorted by hop distance,
/// then id. An unknown node yields an empty walk.
pub fn compute_impact(
    store: &GraphStore,
    node_id: &str,
    max_hops: usize,
    direction: ImpactDirection,
) -> Walk {
    if !store.contains_node(node_id) {
        return Walk::default();
    }
    let seeds = [node_id.to_string()];

    let mut walk = match direction {
        ImpactDirection::Downstream => bfs(store, &seeds, Direction::Outgoing, None, max_hops),
        ImpactDirection::Upstream => bfs(store, &seeds, Direction::Incoming, None, max_hops),
        ImpactDirection::Both => bfs(store, &seeds, Direction::Any, None, max_hops),
    };

    let mut order: Vec<String> = walk.distance.keys().cloned().collect();
    order.sort_by(|a, b| walk.distance[a].cmp(&walk.distance[b]).then_with(|| a.cmp(b)));
    walk.order = order;

    tracing::debug!(
        node_id,
        ?direction,
        max_hops,
        reached = walk.order.len() - 1,
        "Computed impact"
    );
    walk
}
