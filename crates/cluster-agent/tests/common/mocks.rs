// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock implementations of agent collaborators for integration tests

use cluster_agent::event::Event;
use cluster_agent::exporter::{ExportError, Exporter};
use cluster_agent::listener::ShardStateListener;
use cluster_agent::provider::{
    ShardEnumerator, ShardStateSource, ShardSubscription, SnapshotError, SnapshotProvider,
};
use cluster_agent::state::ClusterState;
use cluster_agent::stats::{ClusterStats, IndicesStats, NodeStats, ShardStats};
use cluster_agent::util::now_ms;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Snapshot provider backed by a swappable in-memory state.
pub struct ScriptedProvider {
    state: Mutex<ClusterState>,
}

impl ScriptedProvider {
    pub fn new(state: ClusterState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn set_state(&self, state: ClusterState) {
        *self.state.lock().unwrap() = state;
    }
}

#[async_trait::async_trait]
impl SnapshotProvider for ScriptedProvider {
    async fn cluster_state(&self) -> Result<ClusterState, SnapshotError> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn node_stats(&self) -> Result<NodeStats, SnapshotError> {
        let state = self.state.lock().unwrap();
        let node = state
            .local_node()
            .cloned()
            .ok_or_else(|| SnapshotError::Unavailable("no local node".into()))?;
        Ok(NodeStats {
            node,
            timestamp_ms: now_ms(),
            payload: serde_json::json!({"heap_used_bytes": 4096}),
        })
    }

    async fn indices_stats(&self, patterns: &[String]) -> Result<IndicesStats, SnapshotError> {
        Ok(IndicesStats {
            indices: patterns.to_vec(),
            timestamp_ms: now_ms(),
            payload: serde_json::json!({"docs": 0}),
        })
    }

    async fn cluster_stats(&self) -> Result<ClusterStats, SnapshotError> {
        let state = self.state.lock().unwrap();
        Ok(ClusterStats {
            cluster_name: state.cluster_name.clone(),
            timestamp_ms: now_ms(),
            payload: serde_json::json!({"nodes": state.nodes.len()}),
        })
    }

    fn concrete_indices(&self, _patterns: &[String]) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.indices.iter().cloned().collect()
    }
}

/// Shard enumerator returning a fixed shard stats set.
pub struct StaticEnumerator {
    pub shards: Vec<ShardStats>,
    pub calls: AtomicUsize,
}

impl StaticEnumerator {
    pub fn new(shards: Vec<ShardStats>) -> Self {
        Self {
            shards,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ShardEnumerator for StaticEnumerator {
    async fn started_shards(&self, _patterns: &[String]) -> Result<Vec<ShardStats>, SnapshotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.shards.clone())
    }
}

/// Shard state source that hands the registered listener back to the test.
#[derive(Default)]
pub struct RegistrySource {
    listener: Mutex<Option<ShardStateListener>>,
    pub unsubscribes: Arc<AtomicUsize>,
}

impl RegistrySource {
    pub fn listener(&self) -> Option<ShardStateListener> {
        self.listener.lock().unwrap().clone()
    }
}

impl ShardStateSource for RegistrySource {
    fn subscribe(&self, listener: ShardStateListener) -> ShardSubscription {
        *self.listener.lock().unwrap() = Some(listener);
        let unsubscribes = Arc::clone(&self.unsubscribes);
        ShardSubscription::new(move || {
            unsubscribes.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Exporter that records every artifact it receives; optionally fails every
/// call to exercise fan-out isolation.
pub struct RecordingExporter {
    name: String,
    fail: bool,
    pub events: Mutex<Vec<Event>>,
    pub node_stats_calls: AtomicUsize,
    pub shard_stats_calls: AtomicUsize,
    pub indices_stats_calls: AtomicUsize,
    pub cluster_stats_calls: AtomicUsize,
}

impl RecordingExporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail: false,
            events: Mutex::new(Vec::new()),
            node_stats_calls: AtomicUsize::new(0),
            shard_stats_calls: AtomicUsize::new(0),
            indices_stats_calls: AtomicUsize::new(0),
            cluster_stats_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        let mut exporter = Self::new(name);
        exporter.fail = true;
        exporter
    }

    pub fn recorded_events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), ExportError> {
        if self.fail {
            Err(ExportError::Destination("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Exporter for RecordingExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export_node_stats(&self, _stats: &NodeStats) -> Result<(), ExportError> {
        self.node_stats_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn export_shard_stats(&self, _stats: &[ShardStats]) -> Result<(), ExportError> {
        self.shard_stats_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn export_indices_stats(&self, _stats: &IndicesStats) -> Result<(), ExportError> {
        self.indices_stats_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn export_cluster_stats(&self, _stats: &ClusterStats) -> Result<(), ExportError> {
        self.cluster_stats_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn export_events(&self, events: &[Event]) -> Result<(), ExportError> {
        self.events.lock().unwrap().extend_from_slice(events);
        self.outcome()
    }
}
