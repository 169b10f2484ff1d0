//! Stale node pruning.
//!
//! Runs off the request path: either once on demand or on a tokio interval.
//! Each pass removes nodes whose last sighting is older than the retention
//! window, together with every edge attached to them.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{interval, Duration, MissedTickBehavior};

use topograph_core::config::PrunerConfig;
use topograph_graph::{GraphError, GraphStore, PruneReport};

use crate::error::{IngestError, Result};

/// Remove nodes last seen before `now - ttl` and detach their edges.
pub fn prune_stale(
    store: &GraphStore,
    now: DateTime<Utc>,
    ttl: TimeDelta,
) -> std::result::Result<PruneReport, GraphError> {
    let cutoff = now.checked_sub_signed(ttl).unwrap_or(DateTime::<Utc>::MIN_UTC);
    store.remove_stale(cutoff)
}

/// Periodic pruner bound to one store.
#[derive(Debug, Clone)]
pub struct StalePruner {
    store: GraphStore,
    config: PrunerConfig,
}

impl StalePruner {
    pub fn new(store: GraphStore, config: PrunerConfig) -> Self {
        Self { store, config }
    }

    /// One pass at the current time.
    pub fn run_once(&self) -> Result<PruneReport> {
        let report = prune_stale(&self.store, Utc::now(), self.config.ttl())?;
        tracing::info!(
            nodes_removed = report.nodes_removed,
            edges_removed = report.edges_removed,
            ttl_hours = self.config.ttl_hours,
            "Prune pass complete"
        );
        Ok(report)
    }

    /// Prune every `interval_secs` until `shutdown` resolves. The first pass
    /// runs immediately.
    ///
    /// Passes run on the blocking pool since they hold the store's write gate.
    /// A failed pass is logged and retried on the next tick unless the store
    /// has been closed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if !self.config.enabled {
            tracing::info!("Pruner disabled, not scheduling");
            shutdown.await;
            return Ok(());
        }

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_secs = self.config.interval_secs,
            ttl_hours = self.config.ttl_hours,
            "Pruner started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Pruner stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let pruner = self.clone();
                    let pass = tokio::task::spawn_blocking(move || pruner.run_once())
                        .await
                        .map_err(|e| IngestError::Task(e.to_string()))?;
                    if let Err(e) = pass {
                        tracing::error!(error = %e, "Prune pass failed");
                        if !self.store.is_open() {
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
