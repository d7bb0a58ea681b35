// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log exporter: writes artifact summaries to the tracing pipeline.
//!
//! Useful as a default sink and for local debugging; heavy payloads are
//! summarized, events are logged one line each.

use super::{Exporter, ExportError};
use crate::event::Event;
use crate::stats::{ClusterStats, IndicesStats, NodeStats, ShardStats};
use async_trait::async_trait;
use tracing::info;

pub struct LogExporter {
    name: String,
}

impl LogExporter {
    pub fn new(name: impl Into<String>) -> Self {
        LogExporter { name: name.into() }
    }
}

impl Default for LogExporter {
    fn default() -> Self {
        LogExporter::new("log")
    }
}

#[async_trait]
impl Exporter for LogExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export_node_stats(&self, stats: &NodeStats) -> Result<(), ExportError> {
        info!(
            exporter = %self.name,
            node = %stats.node.name,
            timestamp_ms = stats.timestamp_ms,
            "node stats"
        );
        Ok(())
    }

    async fn export_shard_stats(&self, stats: &[ShardStats]) -> Result<(), ExportError> {
        info!(exporter = %self.name, shards = stats.len(), "shard stats");
        Ok(())
    }

    async fn export_indices_stats(&self, stats: &IndicesStats) -> Result<(), ExportError> {
        info!(
            exporter = %self.name,
            indices = stats.indices.len(),
            timestamp_ms = stats.timestamp_ms,
            "indices stats"
        );
        Ok(())
    }

    async fn export_cluster_stats(&self, stats: &ClusterStats) -> Result<(), ExportError> {
        info!(
            exporter = %self.name,
            cluster = %stats.cluster_name,
            timestamp_ms = stats.timestamp_ms,
            "cluster stats"
        );
        Ok(())
    }

    async fn export_events(&self, events: &[Event]) -> Result<(), ExportError> {
        for event in events {
            info!(
                exporter = %self.name,
                kind = event.kind.name(),
                cluster = %event.cluster_name,
                source = %event.source,
                "cluster event"
            );
        }
        Ok(())
    }
}
