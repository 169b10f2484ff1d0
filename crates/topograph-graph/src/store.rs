//! The graph store: owned node/edge maps, adjacency and secondary indices.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use topograph_core::config::StoreConfig;
use topograph_core::{Edge, EdgeKey, EdgeKind, Node, NodeKind};

use crate::snapshot::Snapshot;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Node not found: {id}")]
    NotFound { id: String },

    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Whether the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Unavailable(_) | GraphError::Io(_))
    }
}

/// Per-node edge index, keyed by edge kind then neighbor id.
#[derive(Debug, Clone, Default)]
pub(crate) struct Adjacency {
    pub(crate) outgoing: HashMap<EdgeKind, BTreeSet<String>>,
    pub(crate) incoming: HashMap<EdgeKind, BTreeSet<String>>,
}

impl Adjacency {
    pub(crate) fn is_empty(&self) -> bool {
        self.outgoing.values().all(BTreeSet::is_empty)
            && self.incoming.values().all(BTreeSet::is_empty)
    }
}

pub(crate) struct StoreInner {
    pub(crate) nodes: DashMap<String, Node>,
    pub(crate) edges: DashMap<EdgeKey, Edge>,
    pub(crate) adjacency: DashMap<String, Adjacency>,
    pub(crate) by_kind: DashMap<NodeKind, HashSet<String>>,
    pub(crate) by_status: DashMap<String, HashSet<String>>,
    /// Upserts hold this shared; stale removal holds it exclusively.
    pub(crate) write_gate: RwLock<()>,
    open: AtomicBool,
    snapshot_path: Option<PathBuf>,
}

/// Thread-safe in-process property graph.
///
/// This is the single owner of every node and edge record. Engines hold a
/// clone of the handle, never copies of the records. Clone is cheap (inner Arc).
///
/// Lock discipline: writers touch maps in the order nodes, edges, adjacency,
/// and a node entry may be held while its kind/status index entries are
/// updated. Readers hold at most one map guard at a time.
#[derive(Clone)]
pub struct GraphStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.inner.nodes.len())
            .field("edges", &self.inner.edges.len())
            .field("open", &self.is_open())
            .field("snapshot_path", &self.inner.snapshot_path)
            .finish()
    }
}

impl GraphStore {
    fn empty(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                nodes: DashMap::new(),
                edges: DashMap::new(),
                adjacency: DashMap::new(),
                by_kind: DashMap::new(),
                by_status: DashMap::new(),
                write_gate: RwLock::new(()),
                open: AtomicBool::new(true),
                snapshot_path,
            }),
        }
    }

    /// An open store with no persistence.
    pub fn in_memory() -> Self {
        Self::empty(None)
    }

    /// Open the store, loading the configured snapshot if one exists.
    ///
    /// Indices are rebuilt from the loaded records. Edges whose endpoints are
    /// absent from the snapshot are dropped.
    pub fn open(config: &StoreConfig) -> Result<Self, GraphError> {
        let store = Self::empty(config.snapshot_path.clone());

        let Some(path) = config.snapshot_path.as_deref() else {
            tracing::info!("Opened in-memory graph store");
            return Ok(store);
        };

        if !path.exists() {
            tracing::info!(path = %path.display(), "No snapshot found, starting empty");
            return Ok(store);
        }

        let snapshot = Snapshot::read(path)?;
        let (nodes, edges) = store.load(snapshot);
        tracing::info!(
            path = %path.display(),
            nodes,
            edges,
            "Loaded graph snapshot"
        );
        Ok(store)
    }

    /// Flush the snapshot (if configured) and mark the store closed.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<(), GraphError> {
        // Wait for in-flight upserts before refusing new ones.
        let _gate = self.inner.write_gate.write();
        if !self.inner.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(path) = self.inner.snapshot_path.as_deref() {
            self.write_snapshot(path)?;
        }
        tracing::info!("Graph store closed");
        Ok(())
    }

    /// Write the snapshot without closing.
    pub fn flush(&self) -> Result<(), GraphError> {
        let _gate = self.inner.write_gate.write();
        self.ensure_open()?;
        match self.inner.snapshot_path.as_deref() {
            Some(path) => self.write_snapshot(path),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.inner.snapshot_path.as_deref()
    }

    /// Fails with `Unavailable` once the store is closed.
    pub fn ensure_open(&self) -> Result<(), GraphError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(GraphError::Unavailable("store is closed".to_string()))
        }
    }

    fn write_snapshot(&self, path: &Path) -> Result<(), GraphError> {
        let snapshot = self.snapshot();
        snapshot.write(path)?;
        tracing::info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Wrote graph snapshot"
        );
        Ok(())
    }

    /// Copy every record out of the store, ordered by identity.
    pub fn snapshot(&self) -> Snapshot {
        let mut nodes: Vec<Node> = self.inner.nodes.iter().map(|e| e.value().clone()).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.inner.edges.iter().map(|e| e.value().clone()).collect();
        edges.sort_by_key(Edge::key);
        Snapshot { nodes, edges }
    }

    /// Insert snapshot records and rebuild indices. Returns (nodes, edges) kept.
    fn load(&self, snapshot: Snapshot) -> (usize, usize) {
        for node in snapshot.nodes {
            if let Some(previous) = self.inner.nodes.insert(node.id.clone(), node.clone()) {
                tracing::warn!(id = %previous.id, "Duplicate node id in snapshot, keeping last");
                self.unindex_node(&previous.id, previous.kind, &previous.status);
            }
            self.index_node(&node.id, node.kind, &node.status);
        }

        let mut kept = 0;
        for edge in snapshot.edges {
            let key = edge.key();
            let endpoints_present = self.inner.nodes.contains_key(&key.source_id)
                && self.inner.nodes.contains_key(&key.target_id);
            if !endpoints_present {
                tracing::warn!(edge = %key, "Dropping snapshot edge with missing endpoint");
                continue;
            }
            if self.inner.edges.insert(key.clone(), edge).is_none() {
                kept += 1;
            }
            self.link(&key);
        }
        (self.inner.nodes.len(), kept)
    }

    // ── Index maintenance ────────────────────────────────────────

    pub(crate) fn index_node(&self, id: &str, kind: NodeKind, status: &str) {
        self.inner
            .by_kind
            .entry(kind)
            .or_default()
            .insert(id.to_string());
        self.inner
            .by_status
            .entry(status.to_string())
            .or_default()
            .insert(id.to_string());
    }

    pub(crate) fn unindex_node(&self, id: &str, kind: NodeKind, status: &str) {
        if let Some(mut ids) = self.inner.by_kind.get_mut(&kind) {
            ids.remove(id);
        }
        self.inner.by_kind.remove_if(&kind, |_, ids| ids.is_empty());
        if let Some(mut ids) = self.inner.by_status.get_mut(status) {
            ids.remove(id);
        }
        self.inner.by_status.remove_if(status, |_, ids| ids.is_empty());
    }

    /// Record an edge in both endpoints' adjacency.
    pub(crate) fn link(&self, key: &EdgeKey) {
        self.inner
            .adjacency
            .entry(key.source_id.clone())
            .or_default()
            .outgoing
            .entry(key.kind)
            .or_default()
            .insert(key.target_id.clone());
        self.inner
            .adjacency
            .entry(key.target_id.clone())
            .or_default()
            .incoming
            .entry(key.kind)
            .or_default()
            .insert(key.source_id.clone());
    }
}
