//! Breadth-first primitives over the live store.
//!
//! - `bfs`: layered walk to a hop bound, recording distances and traversed edges
//! - `shortest_path`: min-hop path between two nodes
//! - `reachable_in_range`: nodes at the end of some edge-unique path of length in [min, max]
//!
//! Neighbors come back from the store sorted, so every walk is deterministic
//! for a fixed graph.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use topograph_core::{EdgeKey, EdgeKind};
use topograph_graph::{Direction, GraphStore};

/// Outcome of a bounded breadth-first walk.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    /// Hop distance of every reached node, seeds at 0.
    pub distance: HashMap<String, usize>,
    /// Nodes in discovery order.
    pub order: Vec<String>,
    /// Every edge followed out of a node closer than the bound, including
    /// edges that led back into already visited nodes.
    pub edges: BTreeSet<EdgeKey>,
}

impl Walk {
    pub fn visited(&self) -> HashSet<String> {
        self.distance.keys().cloned().collect()
    }
}

/// Walk from `seeds` up to `max_depth` hops. No node is visited twice.
pub fn bfs(
    store: &GraphStore,
    seeds: &[String],
    direction: Direction,
    kinds: Option<&[EdgeKind]>,
    max_depth: usize,
) -> Walk {
    let mut walk = Walk::default();
    let mut queue = VecDeque::new();

    for seed in seeds {
        if walk.distance.contains_key(seed) {
            continue;
        }
        walk.distance.insert(seed.clone(), 0);
        walk.order.push(seed.clone());
        queue.push_back((seed.clone(), 0));
    }

    while let Some((node, hops)) = queue.pop_front() {
        if hops >= max_depth {
            continue;
        }
        for neighbor in store.neighbors(&node, direction, kinds) {
            walk.edges.insert(neighbor.edge);
            if walk.distance.contains_key(&neighbor.id) {
                continue;
            }
            walk.distance.insert(neighbor.id.clone(), hops + 1);
            walk.order.push(neighbor.id.clone());
            queue.push_back((neighbor.id, hops + 1));
        }
    }

    walk
}

/// A min-hop path as parallel node and edge lists; `edges[i]` joins
/// `nodes[i]` and `nodes[i + 1]` in its stored direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPath {
    pub nodes: Vec<String>,
    pub edges: Vec<EdgeKey>,
}

impl RawPath {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Shortest path from `source` to `target` ignoring edge direction, at most
/// `max_depth` hops. Both ids must exist; `None` if no path fits the bound.
pub fn shortest_path(
    store: &GraphStore,
    source: &str,
    target: &str,
    max_depth: usize,
) -> Option<RawPath> {
    if !store.contains_node(source) || !store.contains_node(target) {
        return None;
    }
    if source == target {
        return Some(RawPath {
            nodes: vec![source.to_string()],
            edges: Vec::new(),
        });
    }

    // child -> (parent, connecting edge)
    let mut parent: HashMap<String, (String, EdgeKey)> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::from([source.to_string()]);
    let mut queue = VecDeque::from([(source.to_string(), 0usize)]);

    'search: while let Some((node, hops)) = queue.pop_front() {
        if hops >= max_depth {
            continue;
        }
        for neighbor in store.neighbors(&node, Direction::Any, None) {
            if !seen.insert(neighbor.id.clone()) {
                continue;
            }
            parent.insert(neighbor.id.clone(), (node.clone(), neighbor.edge));
            if neighbor.id == target {
                break 'search;
            }
            queue.push_back((neighbor.id, hops + 1));
        }
    }

    let mut nodes = vec![target.to_string()];
    let mut edges = Vec::new();
    let mut cursor = target.to_string();
    while cursor != source {
        let (prev, edge) = parent.get(&cursor)?.clone();
        edges.push(edge);
        nodes.push(prev.clone());
        cursor = prev;
    }
    nodes.reverse();
    edges.reverse();
    Some(RawPath { nodes, edges })
}

/// Nodes at the end of some path from `frontier` whose hop count lies in
/// `[min_depth, max_depth]`, following only `kinds` in `direction`.
///
/// A path never reuses an edge, though it may pass through a node twice, so
/// an origin can reach itself around a cycle. Bouncing back over the edge
/// just taken does not count as a longer path.
pub fn reachable_in_range(
    store: &GraphStore,
    frontier: &BTreeSet<String>,
    direction: Direction,
    kinds: Option<&[EdgeKind]>,
    min_depth: usize,
    max_depth: usize,
) -> BTreeSet<String> {
    let search = TrailSearch {
        store,
        direction,
        kinds,
        min_depth,
        max_depth,
    };
    let mut found = BTreeSet::new();
    for origin in frontier {
        let mut used = HashSet::new();
        search.extend(origin, 0, &mut used, &mut found);
    }
    found
}

/// Depth-first enumeration of edge-unique paths from one origin.
struct TrailSearch<'a> {
    store: &'a GraphStore,
    direction: Direction,
    kinds: Option<&'a [EdgeKind]>,
    min_depth: usize,
    max_depth: usize,
}

impl TrailSearch<'_> {
    fn extend(
        &self,
        node: &str,
        hops: usize,
        used: &mut HashSet<EdgeKey>,
        found: &mut BTreeSet<String>,
    ) {
        if hops > 0 && hops >= self.min_depth {
            found.insert(node.to_string());
        }
        if hops == self.max_depth {
            return;
        }
        for neighbor in self.store.neighbors(node, self.direction, self.kinds) {
            if !used.insert(neighbor.edge.clone()) {
                continue;
            }
            self.extend(&neighbor.id, hops + 1, used, found);
            used.remove(&neighbor.edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use topograph_core::{EdgeUpsert, NodeKind, NodeUpsert};

    /// a -calls-> b -calls-> c -calls-> d, plus a -reads-> e.
    fn chain() -> GraphStore {
        let store = GraphStore::in_memory();
        let now = Utc::now();
        for id in ["a", "b", "c", "d", "e"] {
            store.upsert_node(NodeUpsert::new(id, NodeKind::Service), now, "t").unwrap();
        }
        for (s, t, k) in [
            ("a", "b", EdgeKind::Calls),
            ("b", "c", EdgeKind::Calls),
            ("c", "d", EdgeKind::Calls),
            ("a", "e", EdgeKind::Reads),
        ] {
            store.upsert_edge(EdgeUpsert::new(s, t, k), now, "t").unwrap();
        }
        store
    }

    fn ids(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_bfs_respects_depth_and_direction() {
        let store = chain();
        let walk = bfs(&store, &["b".to_string()], Direction::Outgoing, None, 1);
        assert_eq!(walk.order, vec!["b", "c"]);
        assert_eq!(walk.edges.len(), 1);

        let walk = bfs(&store, &["b".to_string()], Direction::Any, None, 2);
        assert_eq!(walk.distance["a"], 1);
        assert_eq!(walk.distance["e"], 2);
        assert_eq!(walk.distance["d"], 2);
    }

    #[test]
    fn test_bfs_kind_filter() {
        let store = chain();
        let reads = [EdgeKind::Reads];
        let walk = bfs(&store, &["a".to_string()], Direction::Outgoing, Some(&reads), 5);
        assert_eq!(walk.order, vec!["a", "e"]);
    }

    #[test]
    fn test_shortest_path_ignores_direction() {
        let store = chain();
        let path = shortest_path(&store, "d", "e", 5).unwrap();
        assert_eq!(path.nodes, vec!["d", "c", "b", "a", "e"]);
        assert_eq!(path.hops(), 4);
        // Edges keep their stored direction.
        assert_eq!(path.edges[0].source_id, "c");
        assert_eq!(path.edges[0].target_id, "d");

        assert!(shortest_path(&store, "d", "e", 3).is_none());
        assert!(shortest_path(&store, "a", "ghost", 5).is_none());
        assert_eq!(shortest_path(&store, "a", "a", 1).unwrap().nodes, vec!["a"]);
    }

    #[test]
    fn test_reachable_in_range_takes_exact_layers() {
        let store = chain();
        let start = BTreeSet::from(["a".to_string()]);

        let two_to_three =
            reachable_in_range(&store, &start, Direction::Outgoing, Some(&[EdgeKind::Calls]), 2, 3);
        assert_eq!(ids(&two_to_three), vec!["c", "d"]);

        let one = reachable_in_range(&store, &start, Direction::Outgoing, None, 1, 1);
        assert_eq!(ids(&one), vec!["b", "e"]);

        let back = reachable_in_range(
            &store,
            &BTreeSet::from(["d".to_string()]),
            Direction::Incoming,
            None,
            1,
            10,
        );
        assert_eq!(ids(&back), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reachable_in_range_terminates_on_cycle() {
        let store = chain();
        store
            .upsert_edge(EdgeUpsert::new("d", "a", EdgeKind::Calls), Utc::now(), "t")
            .unwrap();
        let start = BTreeSet::from(["a".to_string()]);
        let calls = [EdgeKind::Calls];
        let all = reachable_in_range(&store, &start, Direction::Outgoing, Some(&calls), 1, 10);
        assert_eq!(ids(&all), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_reachable_in_range_never_reuses_an_edge() {
        let store = GraphStore::in_memory();
        let now = Utc::now();
        for id in ["x", "hub"] {
            store.upsert_node(NodeUpsert::new(id, NodeKind::Service), now, "t").unwrap();
        }
        store
            .upsert_edge(EdgeUpsert::new("x", "hub", EdgeKind::Calls), now, "t")
            .unwrap();
        let start = BTreeSet::from(["x".to_string()]);

        // x -> hub -> x would need the same edge twice.
        assert!(reachable_in_range(&store, &start, Direction::Any, None, 2, 3).is_empty());
        assert_eq!(
            ids(&reachable_in_range(&store, &start, Direction::Any, None, 1, 3)),
            vec!["hub"]
        );

        // A second edge of another kind is a distinct relationship.
        store
            .upsert_edge(EdgeUpsert::new("hub", "x", EdgeKind::DependsOn), now, "t")
            .unwrap();
        assert_eq!(
            ids(&reachable_in_range(&store, &start, Direction::Any, None, 2, 2)),
            vec!["x"]
        );
    }
}
