// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Domain events synthesized from cluster-state changes.

use crate::health::HealthStatus;
use crate::state::{ClusterNode, ClusterState, ShardRouting};
use serde::Serialize;
use std::sync::Arc;

/// A single monitoring event.
///
/// Shared fields live here; the kind-specific payload is in [`EventKind`].
/// Timestamps are non-decreasing in emission order from a single producer.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp_ms: u64,
    pub cluster_name: String,
    /// Human-readable origin of the event, e.g. the agent's node label.
    pub source: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(
        timestamp_ms: u64,
        cluster_name: impl Into<String>,
        source: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Event {
            timestamp_ms,
            cluster_name: cluster_name.into(),
            source: source.into(),
            kind,
        }
    }
}

/// Kind-specific payload of an [`Event`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NodeJoined {
        node: ClusterNode,
    },
    NodeLeft {
        node: ClusterNode,
    },
    MasterElected {
        node: ClusterNode,
    },
    BlockAdded {
        block: String,
    },
    BlockRemoved {
        block: String,
    },
    IndexCreated {
        index: String,
    },
    IndexDeleted {
        index: String,
    },
    ShardInitializing {
        shard: ShardRouting,
        node: Option<ClusterNode>,
    },
    ShardStarted {
        shard: ShardRouting,
        node: Option<ClusterNode>,
    },
    ShardRelocating {
        shard: ShardRouting,
        node: Option<ClusterNode>,
    },
    ShardPromotedToPrimary {
        shard: ShardRouting,
        node: Option<ClusterNode>,
    },
    ClusterStatusChanged {
        previous: Option<HealthStatus>,
        current: HealthStatus,
    },
    IndexStatusChanged {
        index: String,
        previous: Option<HealthStatus>,
        current: HealthStatus,
    },
    /// Coarse "something changed" signal carrying the whole snapshot.
    /// `reason` lists the categories that changed, comma-joined.
    ClusterStateSnapshot {
        status: HealthStatus,
        reason: String,
        state: Arc<ClusterState>,
    },
}

impl EventKind {
    /// Stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NodeJoined { .. } => "node_joined",
            EventKind::NodeLeft { .. } => "node_left",
            EventKind::MasterElected { .. } => "master_elected",
            EventKind::BlockAdded { .. } => "block_added",
            EventKind::BlockRemoved { .. } => "block_removed",
            EventKind::IndexCreated { .. } => "index_created",
            EventKind::IndexDeleted { .. } => "index_deleted",
            EventKind::ShardInitializing { .. } => "shard_initializing",
            EventKind::ShardStarted { .. } => "shard_started",
            EventKind::ShardRelocating { .. } => "shard_relocating",
            EventKind::ShardPromotedToPrimary { .. } => "shard_promoted_to_primary",
            EventKind::ClusterStatusChanged { .. } => "cluster_status_changed",
            EventKind::IndexStatusChanged { .. } => "index_status_changed",
            EventKind::ClusterStateSnapshot { .. } => "cluster_state_snapshot",
        }
    }
}
