// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Immutable cluster-state snapshots.
//!
//! A [`ClusterState`] is produced fresh on every poll and never mutated
//! afterwards; the export worker keeps the previous snapshot only long enough
//! to diff it against the next one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A member of the cluster at the time the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: String,
    pub name: String,
    pub address: String,
    pub master_eligible: bool,
    pub data: bool,
}

impl ClusterNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        ClusterNode {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            master_eligible: true,
            data: true,
        }
    }
}

/// Lifecycle state of a single shard copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardLifecycle {
    Unassigned,
    Initializing,
    Started,
    Relocating,
    Closed,
}

/// One entry of the routing table: a shard copy and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRouting {
    pub index: String,
    pub shard: u32,
    pub primary: bool,
    pub state: ShardLifecycle,
    /// Node currently holding this copy, `None` while unassigned.
    pub node_id: Option<String>,
    /// Target node while the copy is relocating.
    pub relocating_node_id: Option<String>,
}

impl ShardRouting {
    pub fn is_assigned(&self) -> bool {
        self.node_id.is_some()
    }

    /// Short human-readable identity used in log lines and event sources.
    pub fn describe(&self) -> String {
        format!("[{}][{}]", self.index, self.shard)
    }
}

/// Point-in-time view of cluster membership, blocks, indices and routing.
///
/// Exactly one node is the local one and at most one is master at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    pub cluster_name: String,
    pub version: u64,
    /// Node id -> node descriptor.
    pub nodes: BTreeMap<String, ClusterNode>,
    pub local_node_id: Option<String>,
    pub master_node_id: Option<String>,
    /// Global cluster blocks (e.g. read-only), by block id.
    pub blocks: BTreeSet<String>,
    /// Names of all indices present in the cluster metadata.
    pub indices: BTreeSet<String>,
    /// Index name -> shard copies.
    pub routing: BTreeMap<String, Vec<ShardRouting>>,
}

impl ClusterState {
    /// An empty snapshot, the "previous" side of a first-ever diff.
    pub fn empty(cluster_name: impl Into<String>) -> Self {
        ClusterState {
            cluster_name: cluster_name.into(),
            version: 0,
            nodes: BTreeMap::new(),
            local_node_id: None,
            master_node_id: None,
            blocks: BTreeSet::new(),
            indices: BTreeSet::new(),
            routing: BTreeMap::new(),
        }
    }

    pub fn local_node(&self) -> Option<&ClusterNode> {
        self.local_node_id.as_ref().and_then(|id| self.nodes.get(id))
    }

    pub fn master_node(&self) -> Option<&ClusterNode> {
        self.master_node_id.as_ref().and_then(|id| self.nodes.get(id))
    }

    pub fn local_node_is_master(&self) -> bool {
        match (&self.local_node_id, &self.master_node_id) {
            (Some(local), Some(master)) => local == master,
            _ => false,
        }
    }

    /// All shard copies across every index, in routing-table order.
    pub fn all_shards(&self) -> impl Iterator<Item = &ShardRouting> {
        self.routing.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> ClusterNode {
        ClusterNode::new(id, format!("node-{id}"), format!("10.0.0.{id}:9300"))
    }

    #[test]
    fn test_local_node_is_master() {
        let mut state = ClusterState::empty("test-cluster");
        state.nodes.insert("a".into(), node("a"));
        state.nodes.insert("b".into(), node("b"));
        state.local_node_id = Some("a".into());
        state.master_node_id = Some("b".into());
        assert!(!state.local_node_is_master());

        state.master_node_id = Some("a".into());
        assert!(state.local_node_is_master());
    }

    #[test]
    fn test_empty_state_has_no_master() {
        let state = ClusterState::empty("test-cluster");
        assert!(!state.local_node_is_master());
        assert!(state.master_node().is_none());
        assert!(state.local_node().is_none());
        assert_eq!(state.all_shards().count(), 0);
    }

    #[test]
    fn test_all_shards_spans_indices() {
        let mut state = ClusterState::empty("test-cluster");
        state.routing.insert(
            "idx-a".into(),
            vec![ShardRouting {
                index: "idx-a".into(),
                shard: 0,
                primary: true,
                state: ShardLifecycle::Started,
                node_id: Some("a".into()),
                relocating_node_id: None,
            }],
        );
        state.routing.insert(
            "idx-b".into(),
            vec![ShardRouting {
                index: "idx-b".into(),
                shard: 0,
                primary: true,
                state: ShardLifecycle::Initializing,
                node_id: Some("a".into()),
                relocating_node_id: None,
            }],
        );
        assert_eq!(state.all_shards().count(), 2);
    }
}
