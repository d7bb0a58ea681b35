// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cluster and per-index health derivation.

use crate::state::{ClusterState, ShardLifecycle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate health of the cluster or of a single index.
///
/// Ordered so that `max()` over a set of index statuses yields the
/// cluster-wide status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[display("green")]
    Green,
    #[display("yellow")]
    Yellow,
    #[display("red")]
    Red,
}

/// Health computed from one cluster-state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterHealth {
    pub status: HealthStatus,
    pub indices: BTreeMap<String, HealthStatus>,
}

/// Collaborator capability: derive health from a snapshot.
pub trait HealthCalculator: Send + Sync {
    fn compute_health(&self, state: &ClusterState) -> ClusterHealth;
}

/// Default calculator derived from the routing table alone: an index is red
/// if any primary copy is not active, yellow if any replica copy is not
/// active, green otherwise. The cluster status is the worst index status.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoutingHealthCalculator;

impl HealthCalculator for RoutingHealthCalculator {
    fn compute_health(&self, state: &ClusterState) -> ClusterHealth {
        let mut indices = BTreeMap::new();
        for (index, shards) in &state.routing {
            let mut status = HealthStatus::Green;
            for shard in shards {
                let active = shard.is_assigned()
                    && matches!(
                        shard.state,
                        ShardLifecycle::Started | ShardLifecycle::Relocating
                    );
                if !active {
                    let severity = if shard.primary {
                        HealthStatus::Red
                    } else {
                        HealthStatus::Yellow
                    };
                    status = status.max(severity);
                }
            }
            indices.insert(index.clone(), status);
        }
        // Indices with metadata but no routing entries have no active primary.
        for index in &state.indices {
            indices.entry(index.clone()).or_insert(HealthStatus::Red);
        }
        let status = indices
            .values()
            .max()
            .copied()
            .unwrap_or(HealthStatus::Green);
        ClusterHealth { status, indices }
    }
}
