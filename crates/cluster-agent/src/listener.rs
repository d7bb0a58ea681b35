// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shard-state change listener.
//!
//! Independent of the polling diff, the host notifies the agent synchronously
//! whenever a local shard copy moves between lifecycle states. The listener
//! enqueues directly so transitions are captured without waiting for the next
//! poll, and it never blocks the host's notification path.

use crate::event::{Event, EventKind};
use crate::queue::EventQueue;
use crate::state::{ClusterNode, ShardLifecycle, ShardRouting};
use crate::util::now_ms;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One local shard lifecycle transition as reported by the host.
#[derive(Debug, Clone)]
pub struct ShardTransition {
    pub shard: ShardRouting,
    pub node: Option<ClusterNode>,
    pub previous_state: Option<ShardLifecycle>,
    pub reason: String,
}

/// Cheaply cloneable handle the host invokes on every local shard transition.
///
/// While sampling is disabled the listener discards transitions without
/// enqueueing anything.
#[derive(Clone)]
pub struct ShardStateListener {
    queue: Arc<EventQueue>,
    enabled: Arc<AtomicBool>,
    cluster_name: String,
    source: String,
}

impl ShardStateListener {
    pub fn new(
        queue: Arc<EventQueue>,
        enabled: Arc<AtomicBool>,
        cluster_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        ShardStateListener {
            queue,
            enabled,
            cluster_name: cluster_name.into(),
            source: source.into(),
        }
    }

    /// Called by the host on each local shard transition. Non-blocking.
    pub fn shard_state_changed(&self, transition: ShardTransition) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }

        let kind = match transition.shard.state {
            ShardLifecycle::Initializing => EventKind::ShardInitializing {
                shard: transition.shard.clone(),
                node: transition.node.clone(),
            },
            ShardLifecycle::Started => EventKind::ShardStarted {
                shard: transition.shard.clone(),
                node: transition.node.clone(),
            },
            ShardLifecycle::Relocating => EventKind::ShardRelocating {
                shard: transition.shard.clone(),
                node: transition.node.clone(),
            },
            other => {
                // No event kind covers this state; drop the transition.
                debug!(
                    shard = %transition.shard.describe(),
                    "ignoring shard transition to {:?}",
                    other
                );
                return;
            }
        };

        let source = match transition.previous_state {
            Some(previous) => format!(
                "{} ({:?} -> {:?}: {})",
                self.source, previous, transition.shard.state, transition.reason
            ),
            None => format!("{} ({})", self.source, transition.reason),
        };

        self.queue
            .enqueue(Event::new(now_ms(), &self.cluster_name, source, kind));
    }
}
