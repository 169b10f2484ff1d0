//! Schema registry: variant field catalog and identity validation.
//!
//! The registry never rejects a field. It knows which attribute keys belong
//! to each variant so callers can tell recognized fields apart from extras,
//! and it enforces the identity contract (id + kind for nodes, source +
//! target + kind for edges) before a record is handed to the store.

use crate::error::ValidationError;
use crate::types::{Attributes, EdgeInput, EdgeKind, EdgeUpsert, NodeInput, NodeKind, NodeUpsert};

/// Keys the store maintains itself; agent-supplied values are discarded.
pub const NODE_RESERVED_KEYS: &[&str] = &["created_at", "updated_at", "last_seen_at", "source"];

/// Keys the store maintains itself on edges.
pub const EDGE_RESERVED_KEYS: &[&str] = &["first_seen", "last_seen", "source"];

impl NodeKind {
    /// Variant-specific attribute names recognized for this kind.
    pub fn variant_fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Service => &[
                "language",
                "framework",
                "version",
                "repository_url",
                "commit_hash",
                "tier",
                "is_external",
                "build_id",
                "runtime_version",
                "memory_allocated_mb",
                "cpu_allocated_cores",
                "rps",
                "latency_p99_ms",
                "error_rate_percent",
                "active_connections",
            ],
            NodeKind::Endpoint => &[
                "path",
                "method",
                "rps_limit",
                "timeout_ms",
                "is_public",
                "payload_format",
                "openapi_spec_url",
                "auth_required",
                "deprecated",
                "current_rps",
                "latency_p50_ms",
                "latency_p99_ms",
                "error_count_1h",
            ],
            NodeKind::Deployment => &[
                "replicas_desired",
                "replicas_ready",
                "strategy",
                "namespace",
                "cluster_id",
                "image_tag",
                "helm_chart_version",
                "last_deployed_at",
                "rollback_revision",
                "replicas_available",
                "replicas_unavailable",
            ],
            NodeKind::Pod => &[
                "namespace",
                "node_name",
                "ip_address",
                "phase",
                "restart_count",
                "cpu_usage_m",
                "memory_usage_mi",
                "service_account",
                "qos_class",
            ],
            NodeKind::ComputeNode => &[
                "instance_type",
                "os_image",
                "kernel_version",
                "kubelet_version",
                "architecture",
                "capacity_cpu",
                "capacity_memory_gb",
                "region",
                "zone",
                "internal_ip",
                "external_ip",
                "cpu_usage_percent",
                "memory_usage_percent",
                "disk_pressure",
                "network_unavailable",
            ],
            NodeKind::Database => &[
                "engine",
                "version",
                "capacity_gb",
                "connection_string",
                "is_managed",
                "region",
                "instance_class",
                "max_connections",
                "backup_retention_days",
                "multi_az",
                "active_connections",
                "queries_per_second",
                "replication_lag_ms",
                "disk_usage_percent",
            ],
            NodeKind::Table => &[
                "schema_name",
                "row_count",
                "size_bytes",
                "primary_key",
                "is_partitioned",
                "retention_days",
                "index_count",
                "last_vacuumed_at",
                "table_locks",
                "rows_inserted_per_min",
                "rows_updated_per_min",
                "avg_query_time_ms",
                "dead_tuples_pct",
            ],
            NodeKind::QueueTopic => &[
                "broker",
                "partitions",
                "retention_bytes",
                "retention_ms",
                "message_rate",
                "consumer_groups",
                "max_message_size_bytes",
                "replication_factor",
                "is_dead_letter",
                "consumer_lag",
                "bytes_per_second",
            ],
            NodeKind::Cache => &[
                "engine",
                "eviction_policy",
                "max_memory_mb",
                "hit_rate_target",
                "keys_count",
                "connected_clients",
                "uptime_days",
                "hit_rate",
                "memory_usage_mb",
                "evictions_per_sec",
            ],
            NodeKind::ExternalApi => &[
                "provider",
                "base_url",
                "auth_type",
                "rate_limit_tier",
                "sla_percentage",
                "support_email",
                "documentation_url",
                "ip_whitelisted",
                "response_time_ms",
                "availability_percent",
                "rate_limit_remaining",
            ],
            NodeKind::SecretConfig => &[
                "provider",
                "key_names",
                "rotation_interval_days",
                "last_rotated",
                "is_encrypted",
                "algorithm",
                "vault_path",
                "expiration_date",
                "last_rotated_days_ago",
                "access_count_1h",
            ],
            NodeKind::Library => &[
                "package_manager",
                "version",
                "license",
                "cve_count",
                "is_internal",
                "repository",
                "author",
                "deprecated",
                "is_latest",
                "vulnerabilities_found",
            ],
            NodeKind::TeamOwner => &[
                "email",
                "slack_channel",
                "pagerduty_service",
                "lead_name",
                "department",
                "cost_center",
                "on_call_schedule",
                "active_incidents",
                "services_owned_count",
            ],
            NodeKind::Sla => &[
                "metric_name",
                "target_percentage",
                "window_days",
                "current_value",
                "alert_threshold",
                "violation_count",
                "monitoring_url",
                "error_budget_remaining_pct",
            ],
            NodeKind::RegionCluster => &[
                "provider",
                "region_code",
                "zones",
                "k8s_version",
                "node_count",
                "vpc_id",
                "is_active",
                "total_cpu",
                "total_memory_gb",
                "pods_running",
                "pods_pending",
                "cluster_cpu_usage_pct",
                "cluster_memory_usage_pct",
            ],
        }
    }
}

impl EdgeKind {
    /// Variant-specific attribute names recognized for this kind.
    pub fn variant_fields(&self) -> &'static [&'static str] {
        match self {
            EdgeKind::Calls => &[
                "protocol",
                "rps",
                "latency_p99_ms",
                "error_rate_percent",
                "timeout_ms",
                "retry_count",
                "circuit_breaker_enabled",
                "circuit_breaker_state",
                "payload_size_bytes",
                "latency_p50_ms",
                "request_content_type",
            ],
            EdgeKind::PublishesTo => &[
                "message_size_bytes",
                "batch_size",
                "compression",
                "qos_level",
                "routing_key",
                "partition_key",
                "messages_per_second",
                "ack_mode",
            ],
            EdgeKind::ConsumesFrom => &[
                "consumer_group",
                "lag_messages",
                "processing_time_ms",
                "auto_commit",
                "prefetch_count",
                "concurrent_consumers",
                "messages_per_second",
            ],
            EdgeKind::Reads => &[
                "query_type",
                "rows_returned",
                "index_used",
                "latency_ms",
                "connection_pool_size",
                "cache_hit_ratio",
                "queries_per_second",
                "rows_examined",
            ],
            EdgeKind::Writes => &[
                "query_type",
                "bytes_written",
                "transaction_isolation",
                "latency_ms",
                "batch_size",
                "is_upsert",
                "writes_per_second",
            ],
            EdgeKind::DependsOn => &[
                "criticality",
                "fallback_available",
                "circuit_breaker_state",
                "is_async",
                "impact_score",
                "health_check_status",
            ],
            EdgeKind::DeployedOn => &[
                "path",
                "isolation_level",
                "resource_requests_cpu",
                "resource_requests_mem_mb",
                "resource_limits_cpu",
                "resource_limits_mem_mb",
                "resource_requests_cpu_m",
                "resource_limits_cpu_m",
                "mount_path",
            ],
            EdgeKind::OwnedBy => &[
                "ownership_type",
                "escalation_policy",
                "escalation_level",
                "review_frequency_days",
                "last_reviewed_at",
            ],
            EdgeKind::AuthenticatesVia => &[
                "auth_method",
                "token_expiry_seconds",
                "scopes",
                "mfa_required",
                "issuer",
                "last_rotated_days_ago",
            ],
            EdgeKind::RateLimitedBy => &[
                "limit_type",
                "max_requests",
                "window_seconds",
                "algorithm",
                "throttle_strategy",
                "burst_capacity",
                "current_usage",
                "current_usage_pct",
                "throttled_count_1h",
            ],
            EdgeKind::FailsOverTo => &[
                "trigger_condition",
                "failover_latency_ms",
                "is_active_active",
                "data_loss_acceptable",
                "last_tested_at",
                "failover_time_seconds",
                "last_tested_days_ago",
            ],
        }
    }
}

impl NodeKind {
    /// Keys of `attributes` that are not variant fields of this kind.
    pub fn unrecognized_fields<'a>(
        &self,
        attributes: &'a Attributes,
    ) -> impl Iterator<Item = &'a str> + 'a {
        unrecognized(self.variant_fields(), attributes)
    }
}

impl EdgeKind {
    /// Keys of `attributes` that are not variant fields of this kind.
    pub fn unrecognized_fields<'a>(
        &self,
        attributes: &'a Attributes,
    ) -> impl Iterator<Item = &'a str> + 'a {
        unrecognized(self.variant_fields(), attributes)
    }
}

fn unrecognized<'a>(
    fields: &'static [&'static str],
    attributes: &'a Attributes,
) -> impl Iterator<Item = &'a str> + 'a {
    attributes
        .keys()
        .map(String::as_str)
        .filter(move |key| !fields.contains(key))
}

impl NodeInput {
    /// Enforce the identity contract and resolve the kind.
    pub fn validate(self) -> Result<NodeUpsert, ValidationError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::MissingField {
                record: "node",
                field: "id",
            });
        }
        if self.kind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "node",
                field: "type",
            });
        }
        let kind: NodeKind = self.kind.parse()?;

        let mut attributes = self.attributes;
        for key in NODE_RESERVED_KEYS {
            attributes.remove(*key);
        }

        Ok(NodeUpsert {
            id,
            kind,
            name: self.name,
            description: self.description,
            status: self.status,
            environment: self.environment,
            tags: self.tags,
            attributes,
        })
    }
}

impl EdgeInput {
    /// Enforce the identity contract and resolve the kind.
    pub fn validate(self) -> Result<EdgeUpsert, ValidationError> {
        let source_id = self.source_id.trim().to_string();
        let target_id = self.target_id.trim().to_string();
        if source_id.is_empty() {
            return Err(ValidationError::MissingField {
                record: "edge",
                field: "source_id",
            });
        }
        if target_id.is_empty() {
            return Err(ValidationError::MissingField {
                record: "edge",
                field: "target_id",
            });
        }
        if self.kind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "edge",
                field: "type",
            });
        }
        let kind: EdgeKind = self.kind.parse()?;

        let mut attributes = self.attributes;
        for key in EDGE_RESERVED_KEYS {
            attributes.remove(*key);
        }

        Ok(EdgeUpsert {
            source_id,
            target_id,
            kind,
            weight: self.weight,
            status: self.status,
            attributes,
        })
    }
}
