//! The mutation engine: per-record upsert pipeline with fault isolation.
//!
//! Nodes are applied before edges so an edge may reference a node reported
//! in the same batch. Every record succeeds or fails on its own; failures are
//! collected into the report and never abort the batch.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use topograph_core::config::IngestConfig;
use topograph_core::{EdgeInput, NodeInput, ValidationError};
use topograph_graph::GraphStore;

use crate::error::Result;

/// Batch envelope as posted by agents.
///
/// Records stay raw JSON until each is parsed on its own, so one malformed
/// record is reported instead of rejecting the whole envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyUpdate {
    #[serde(default)]
    pub source: String,
    /// Batch time; ingestion time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

impl TopologyUpdate {
    /// Parse an envelope. Only the envelope shape is checked here; records
    /// are parsed one by one at submit time.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read an envelope from a file.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub source: String,
    pub nodes_processed: usize,
    pub edges_processed: usize,
    pub errors: Vec<String>,
    /// True iff `errors` is empty.
    pub success: bool,
    /// `Kind.field` for every attribute the schema registry does not list
    /// for that kind. Informational; such fields are stored as sent.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unrecognized_fields: BTreeSet<String>,
}

impl BatchReport {
    fn new(source: &str) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            source: source.to_string(),
            nodes_processed: 0,
            edges_processed: 0,
            errors: Vec::new(),
            success: true,
            unrecognized_fields: BTreeSet::new(),
        }
    }

    fn fail(&mut self, message: String) {
        self.errors.push(message);
        self.success = false;
    }
}

/// Applies batches to the store. Holds no records between calls.
#[derive(Debug, Clone)]
pub struct MutationEngine {
    store: GraphStore,
    default_source: String,
}

impl MutationEngine {
    pub fn new(store: GraphStore) -> Self {
        Self::with_config(store, &IngestConfig::default())
    }

    pub fn with_config(store: GraphStore, config: &IngestConfig) -> Self {
        Self {
            store,
            default_source: config.default_source.clone(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Apply typed records with `timestamp` as the batch's "now".
    ///
    /// Errors only if the store is closed before the batch starts.
    pub fn submit_batch(
        &self,
        nodes: Vec<NodeInput>,
        edges: Vec<EdgeInput>,
        source: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<BatchReport> {
        self.submit(
            nodes.into_iter().map(Ok).collect(),
            edges.into_iter().map(Ok).collect(),
            source,
            timestamp,
        )
    }

    /// Apply a raw envelope, parsing each record independently.
    pub fn submit_update(&self, update: TopologyUpdate) -> Result<BatchReport> {
        let timestamp = update.timestamp.unwrap_or_else(Utc::now);
        let nodes = update.nodes.into_iter().map(|raw| parse_record("node", raw)).collect();
        let edges = update.edges.into_iter().map(|raw| parse_record("edge", raw)).collect();
        self.submit(nodes, edges, &update.source, timestamp)
    }

    fn submit(
        &self,
        nodes: Vec<std::result::Result<NodeInput, ValidationError>>,
        edges: Vec<std::result::Result<EdgeInput, ValidationError>>,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        self.store.ensure_open()?;

        let source = if source.trim().is_empty() {
            self.default_source.as_str()
        } else {
            source.trim()
        };
        let mut report = BatchReport::new(source);
        tracing::info!(
            batch_id = %report.batch_id,
            source,
            nodes = nodes.len(),
            edges = edges.len(),
            "Ingesting topology batch"
        );

        for (index, parsed) in nodes.into_iter().enumerate() {
            let upsert = match parsed.and_then(NodeInput::validate) {
                Ok(upsert) => upsert,
                Err(e) => {
                    report.fail(format!("node[{index}]: {e}"));
                    continue;
                }
            };
            let kind = upsert.kind;
            report.unrecognized_fields.extend(
                kind.unrecognized_fields(&upsert.attributes)
                    .map(|field| format!("{kind}.{field}")),
            );
            let id = upsert.id.clone();
            match self.store.upsert_node(upsert, now, source) {
                Ok(_) => report.nodes_processed += 1,
                Err(e) => report.fail(format!("node[{index}] {id}: {e}")),
            }
        }

        for (index, parsed) in edges.into_iter().enumerate() {
            let upsert = match parsed.and_then(EdgeInput::validate) {
                Ok(upsert) => upsert,
                Err(e) => {
                    report.fail(format!("edge[{index}]: {e}"));
                    continue;
                }
            };
            let kind = upsert.kind;
            report.unrecognized_fields.extend(
                kind.unrecognized_fields(&upsert.attributes)
                    .map(|field| format!("{kind}.{field}")),
            );
            let key = upsert.key();
            match self.store.upsert_edge(upsert, now, source) {
                Ok(_) => report.edges_processed += 1,
                Err(e) => report.fail(format!("edge[{index}] {key}: {e}")),
            }
        }

        if !report.unrecognized_fields.is_empty() {
            tracing::debug!(
                batch_id = %report.batch_id,
                fields = ?report.unrecognized_fields,
                "Batch carries fields outside the schema registry"
            );
        }

        if report.success {
            tracing::info!(
                batch_id = %report.batch_id,
                nodes_processed = report.nodes_processed,
                edges_processed = report.edges_processed,
                "Batch applied"
            );
        } else {
            tracing::warn!(
                batch_id = %report.batch_id,
                nodes_processed = report.nodes_processed,
                edges_processed = report.edges_processed,
                errors = report.errors.len(),
                "Batch applied with record errors"
            );
        }
        Ok(report)
    }
}

fn parse_record<T: serde::de::DeserializeOwned>(
    record: &'static str,
    raw: Value,
) -> std::result::Result<T, ValidationError> {
    serde_json::from_value(raw).map_err(|e| ValidationError::Malformed {
        record,
        reason: e.to_string(),
    })
}
