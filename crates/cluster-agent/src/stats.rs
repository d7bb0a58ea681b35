// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Opaque stats bundles handed through to exporters unmodified.
//!
//! These carry whatever the snapshot provider measured as a JSON document;
//! the agent only attaches identity and a capture timestamp.

use crate::state::{ClusterNode, ShardRouting};
use serde::Serialize;

/// Point-in-time statistics for the local node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub node: ClusterNode,
    pub timestamp_ms: u64,
    pub payload: serde_json::Value,
}

/// Point-in-time statistics for a set of indices.
#[derive(Debug, Clone, Serialize)]
pub struct IndicesStats {
    pub indices: Vec<String>,
    pub timestamp_ms: u64,
    pub payload: serde_json::Value,
}

/// Cluster-wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStats {
    pub cluster_name: String,
    pub timestamp_ms: u64,
    pub payload: serde_json::Value,
}

/// Statistics for a single started shard copy.
#[derive(Debug, Clone, Serialize)]
pub struct ShardStats {
    pub shard: ShardRouting,
    pub timestamp_ms: u64,
    pub payload: serde_json::Value,
}
