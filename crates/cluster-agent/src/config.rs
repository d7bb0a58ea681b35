// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent-level sampling configuration.
//!
//! Every field is dynamically reloadable via [`crate::agent::AgentService::update_config`]:
//! index patterns and toggles apply on the next iteration in place, interval
//! transitions across zero start or stop the worker.

use std::time::Duration;

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(600);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Polling interval of the export worker. Zero disables sampling.
    pub sampling_interval: Duration,
    /// Index patterns whose stats are collected on master iterations.
    pub index_patterns: Vec<String>,
    /// Whether per-shard stats are enumerated and exported.
    pub export_shard_stats: bool,
    /// Interval of the liveness snapshot emitted on quiet clusters.
    /// Zero disables the heartbeat.
    pub heartbeat_interval: Duration,
    /// When false, iterations still drain the queue but skip every exporter
    /// call, keeping memory bounded while exports are suppressed.
    pub exporters_enabled: bool,
    /// Bound on the final drain-and-export during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            index_patterns: vec!["_all".to_string()],
            export_shard_stats: false,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            exporters_enabled: true,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl AgentConfig {
    pub fn sampling_enabled(&self) -> bool {
        !self.sampling_interval.is_zero()
    }

    pub fn heartbeat_enabled(&self) -> bool {
        !self.heartbeat_interval.is_zero()
    }
}
