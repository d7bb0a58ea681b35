// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exporter contract and multi-destination fan-out.
//!
//! Each exporter is a named, independently failable sink. The fan-out layer
//! isolates failures per exporter and per artifact; it performs no retries of
//! its own (retry policy, if any, lives inside each exporter).

use crate::event::Event;
use crate::stats::{ClusterStats, IndicesStats, NodeStats, ShardStats};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

pub mod http;
pub mod log;

/// Failures an exporter may report for a single artifact delivery.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The artifact could not be turned into the destination's format.
    #[error("failed to prepare payload: {0}")]
    Payload(String),

    /// The destination rejected or never received the artifact.
    #[error("failed to reach destination: {0}")]
    Destination(String),
}

/// A monitoring sink. All methods may fail; the caller isolates failures so
/// one exporter never affects the others.
#[async_trait]
pub trait Exporter: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire transport resources. Called once before the first export.
    async fn start(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// Stop accepting artifacts. Called once at agent shutdown.
    async fn stop(&self) {}

    /// Release transport resources. Called after `stop`.
    async fn close(&self) {}

    async fn export_node_stats(&self, stats: &NodeStats) -> Result<(), ExportError>;

    async fn export_shard_stats(&self, stats: &[ShardStats]) -> Result<(), ExportError>;

    async fn export_indices_stats(&self, stats: &IndicesStats) -> Result<(), ExportError>;

    async fn export_cluster_stats(&self, stats: &ClusterStats) -> Result<(), ExportError>;

    async fn export_events(&self, events: &[Event]) -> Result<(), ExportError>;
}

/// The fixed set of exporters configured at agent startup.
#[derive(Clone)]
pub struct ExporterSet {
    exporters: Vec<Arc<dyn Exporter>>,
}

macro_rules! fan_out {
    ($self:ident, $artifact:expr, $method:ident, $arg:expr) => {
        for exporter in &$self.exporters {
            if let Err(e) = exporter.$method($arg).await {
                error!(
                    exporter = exporter.name(),
                    "failed to export {}: {e}", $artifact
                );
            }
        }
    };
}

impl ExporterSet {
    pub fn new(exporters: Vec<Arc<dyn Exporter>>) -> Self {
        ExporterSet { exporters }
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub async fn start_all(&self) {
        for exporter in &self.exporters {
            if let Err(e) = exporter.start().await {
                error!(exporter = exporter.name(), "failed to start: {e}");
            }
        }
    }

    pub async fn stop_all(&self) {
        for exporter in &self.exporters {
            exporter.stop().await;
        }
    }

    pub async fn close_all(&self) {
        for exporter in &self.exporters {
            exporter.close().await;
        }
    }

    pub async fn export_node_stats(&self, stats: &NodeStats) {
        fan_out!(self, "node stats", export_node_stats, stats);
    }

    pub async fn export_shard_stats(&self, stats: &[ShardStats]) {
        fan_out!(self, "shard stats", export_shard_stats, stats);
    }

    pub async fn export_indices_stats(&self, stats: &IndicesStats) {
        fan_out!(self, "indices stats", export_indices_stats, stats);
    }

    pub async fn export_cluster_stats(&self, stats: &ClusterStats) {
        fan_out!(self, "cluster stats", export_cluster_stats, stats);
    }

    pub async fn export_events(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        debug!("exporting batch of {} events", events.len());
        fan_out!(self, "events", export_events, events);
    }
}
