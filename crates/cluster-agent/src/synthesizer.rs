// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Snapshot diffing: turns two consecutive cluster states into domain events.
//!
//! Each pass is independent and order-stable within itself. Diffing is a
//! master-only responsibility; the export worker only invokes this when the
//! local node currently holds mastership.

use crate::event::{Event, EventKind};
use crate::health::HealthCalculator;
use crate::state::{ClusterState, ShardLifecycle, ShardRouting};
use crate::util::now_ms;
use std::sync::Arc;
use tracing::warn;

const NODES_JOINED: &str = "nodes joined";
const NODES_LEFT: &str = "nodes left";
const ELECTED_AS_MASTER: &str = "elected as master";
const BLOCKS_ADDED: &str = "blocks added";
const BLOCKS_REMOVED: &str = "blocks removed";
const INDEX_CREATED: &str = "index created";
const INDEX_DELETED: &str = "index deleted";
const ROUTING_CHANGE: &str = "routing change";
const CLUSTER_STATUS: &str = "cluster status changed";
const INDEX_STATUS: &str = "index status changed";

pub struct EventSynthesizer {
    health: Arc<dyn HealthCalculator>,
}

impl EventSynthesizer {
    pub fn new(health: Arc<dyn HealthCalculator>) -> Self {
        EventSynthesizer { health }
    }

    /// Diffs `previous` against `current` and returns the ordered event
    /// sequence describing every observable difference. Identical states
    /// yield an empty sequence; an empty `previous` (first poll) reports
    /// everything as newly appeared.
    pub fn diff(&self, previous: &ClusterState, current: &ClusterState, source: &str) -> Vec<Event> {
        let timestamp_ms = now_ms();
        let mut batch = DiffBatch {
            events: Vec::new(),
            reasons: Vec::new(),
            timestamp_ms,
            cluster_name: &current.cluster_name,
            source,
        };

        self.diff_membership(previous, current, &mut batch);
        self.diff_mastership(previous, current, &mut batch);
        self.diff_blocks(previous, current, &mut batch);
        self.diff_indices(previous, current, &mut batch);
        self.diff_routing(previous, current, &mut batch);
        self.diff_health(previous, current, &mut batch);

        // Composite snapshot only when something actually changed.
        if !batch.events.is_empty() {
            let status = self.health.compute_health(current).status;
            let reason = batch.reasons.join(", ");
            batch.push_event(EventKind::ClusterStateSnapshot {
                status,
                reason,
                state: Arc::new(current.clone()),
            });
        }

        batch.events
    }

    fn diff_membership(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        for (id, node) in &current.nodes {
            if !previous.nodes.contains_key(id) {
                batch.push(NODES_JOINED, EventKind::NodeJoined { node: node.clone() });
            }
        }
        for (id, node) in &previous.nodes {
            if !current.nodes.contains_key(id) {
                batch.push(NODES_LEFT, EventKind::NodeLeft { node: node.clone() });
            }
        }
    }

    // Only the transition into mastership is reported; losing mastership is
    // not separately signaled.
    fn diff_mastership(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        if !previous.local_node_is_master() && current.local_node_is_master() {
            if let Some(node) = current.local_node() {
                batch.push(ELECTED_AS_MASTER, EventKind::MasterElected { node: node.clone() });
            }
        }
    }

    fn diff_blocks(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        for block in current.blocks.difference(&previous.blocks) {
            batch.push(BLOCKS_ADDED, EventKind::BlockAdded { block: block.clone() });
        }
        for block in previous.blocks.difference(&current.blocks) {
            batch.push(BLOCKS_REMOVED, EventKind::BlockRemoved { block: block.clone() });
        }
    }

    fn diff_indices(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        for index in current.indices.difference(&previous.indices) {
            batch.push(INDEX_CREATED, EventKind::IndexCreated { index: index.clone() });
        }
        for index in previous.indices.difference(&current.indices) {
            batch.push(INDEX_DELETED, EventKind::IndexDeleted { index: index.clone() });
        }
    }

    fn diff_routing(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        for (index, shards) in &current.routing {
            for shard in shards {
                let Some(node_id) = shard.node_id.as_deref() else {
                    continue; // unassigned copies are not diffed
                };
                let node = current.nodes.get(node_id).cloned();
                match find_candidate(previous, index, shard, node_id) {
                    None => {
                        batch.push(
                            ROUTING_CHANGE,
                            EventKind::ShardInitializing { shard: shard.clone(), node },
                        );
                    }
                    Some(candidate) if candidate.state != shard.state => match shard.state {
                        ShardLifecycle::Started => {
                            batch.push(
                                ROUTING_CHANGE,
                                EventKind::ShardStarted { shard: shard.clone(), node },
                            );
                        }
                        ShardLifecycle::Relocating => {
                            batch.push(
                                ROUTING_CHANGE,
                                EventKind::ShardRelocating { shard: shard.clone(), node },
                            );
                        }
                        other => {
                            // Fail open: skip the event, keep diffing.
                            warn!(
                                shard = %shard.describe(),
                                "unrecognized shard transition {:?} -> {:?}, event not emitted",
                                candidate.state,
                                other
                            );
                        }
                    },
                    Some(candidate) if !candidate.primary && shard.primary => {
                        batch.push(
                            ROUTING_CHANGE,
                            EventKind::ShardPromotedToPrimary { shard: shard.clone(), node },
                        );
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn diff_health(&self, previous: &ClusterState, current: &ClusterState, batch: &mut DiffBatch<'_>) {
        let previous_health = self.health.compute_health(previous);
        let current_health = self.health.compute_health(current);

        if previous_health.status != current_health.status {
            batch.push(
                CLUSTER_STATUS,
                EventKind::ClusterStatusChanged {
                    previous: Some(previous_health.status),
                    current: current_health.status,
                },
            );
        }

        for (index, status) in &current_health.indices {
            let before = previous_health.indices.get(index).copied();
            if before != Some(*status) {
                batch.push(
                    INDEX_STATUS,
                    EventKind::IndexStatusChanged {
                        index: index.clone(),
                        previous: before,
                        current: *status,
                    },
                );
            }
        }
    }
}

/// Matches a current shard copy against the previous routing table: the
/// candidate either already lived on the same node or was relocating onto it.
fn find_candidate<'a>(
    previous: &'a ClusterState,
    index: &str,
    shard: &ShardRouting,
    node_id: &str,
) -> Option<&'a ShardRouting> {
    previous.routing.get(index)?.iter().find(|candidate| {
        candidate.shard == shard.shard
            && (candidate.node_id.as_deref() == Some(node_id)
                || candidate.relocating_node_id.as_deref() == Some(node_id))
    })
}

struct DiffBatch<'a> {
    events: Vec<Event>,
    reasons: Vec<&'static str>,
    timestamp_ms: u64,
    cluster_name: &'a str,
    source: &'a str,
}

impl DiffBatch<'_> {
    fn push(&mut self, reason: &'static str, kind: EventKind) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
        self.push_event(kind);
    }

    fn push_event(&mut self, kind: EventKind) {
        self.events.push(Event::new(
            self.timestamp_ms,
            self.cluster_name,
            self.source,
            kind,
        ));
    }
}
