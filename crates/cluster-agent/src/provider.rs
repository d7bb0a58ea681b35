// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits supplied by the hosting runtime.
//!
//! The agent never reaches into the cluster itself; everything it knows comes
//! through these seams, which also keep the pipeline testable with mocks.

use crate::listener::ShardStateListener;
use crate::state::ClusterState;
use crate::stats::{ClusterStats, IndicesStats, NodeStats, ShardStats};
use async_trait::async_trait;

/// Failures while fetching a snapshot. Always transient from the agent's
/// point of view: the artifact is skipped and the next interval retries.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot provider unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Supplies cluster topology and statistics on demand.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn cluster_state(&self) -> Result<ClusterState, SnapshotError>;

    async fn node_stats(&self) -> Result<NodeStats, SnapshotError>;

    async fn indices_stats(&self, patterns: &[String]) -> Result<IndicesStats, SnapshotError>;

    async fn cluster_stats(&self) -> Result<ClusterStats, SnapshotError>;

    /// Resolves index patterns to concrete index names.
    fn concrete_indices(&self, patterns: &[String]) -> Vec<String>;
}

/// Enumerates the started shards matching the configured index patterns,
/// yielding point-in-time stats per shard.
#[async_trait]
pub trait ShardEnumerator: Send + Sync {
    async fn started_shards(&self, patterns: &[String]) -> Result<Vec<ShardStats>, SnapshotError>;
}

/// Host-side registry for local shard lifecycle notifications.
///
/// The agent subscribes exactly once at startup and drops the returned
/// subscription exactly once at teardown.
pub trait ShardStateSource: Send + Sync {
    fn subscribe(&self, listener: ShardStateListener) -> ShardSubscription;
}

/// Guard for a registered shard-state listener. Unsubscribes when dropped or
/// when [`ShardSubscription::unsubscribe`] is called explicitly.
pub struct ShardSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ShardSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        ShardSubscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ShardSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ShardSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
