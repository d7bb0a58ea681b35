// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The export worker: a single background task that wakes on the sampling
//! interval, pulls snapshots, diffs them, drains the event queue and fans
//! everything out to the exporters.
//!
//! The worker task is the sole consumer of the queue and the only place that
//! performs outbound I/O, so slow exporters only delay the next iteration and
//! never stall producers. One bad iteration never terminates the loop.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::event::{Event, EventKind};
use crate::exporter::ExporterSet;
use crate::health::HealthCalculator;
use crate::provider::{ShardEnumerator, SnapshotProvider};
use crate::queue::EventQueue;
use crate::state::ClusterState;
use crate::synthesizer::EventSynthesizer;
use crate::util::{join_patterns, now_ms};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of the export worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Running,
    Draining,
    Terminated,
}

/// Handle to a spawned worker. Owned by the agent service; stop requests and
/// the bounded join go through here rather than through field mutation.
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    status_rx: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> WorkerState {
        *self.status_rx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the worker to terminate. On timeout the task is abandoned
    /// and keeps running detached until its final drain completes.
    pub async fn join(self, timeout: Duration) -> Result<(), AgentError> {
        match tokio::time::timeout(timeout, self.join).await {
            Ok(_) => Ok(()),
            Err(_) => Err(AgentError::ShutdownTimeout),
        }
    }
}

pub struct ExportWorker {
    provider: Arc<dyn SnapshotProvider>,
    enumerator: Option<Arc<dyn ShardEnumerator>>,
    health: Arc<dyn HealthCalculator>,
    synthesizer: EventSynthesizer,
    queue: Arc<EventQueue>,
    exporters: ExporterSet,
    config_rx: watch::Receiver<AgentConfig>,
    cancel: CancellationToken,
    status_tx: watch::Sender<WorkerState>,
    source: String,
    previous: Option<ClusterState>,
    last_heartbeat: Instant,
}

impl ExportWorker {
    /// Spawns the worker loop on a dedicated task and returns its handle.
    pub fn spawn(
        provider: Arc<dyn SnapshotProvider>,
        enumerator: Option<Arc<dyn ShardEnumerator>>,
        health: Arc<dyn HealthCalculator>,
        queue: Arc<EventQueue>,
        exporters: ExporterSet,
        config_rx: watch::Receiver<AgentConfig>,
        source: impl Into<String>,
    ) -> WorkerHandle {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(WorkerState::Stopped);
        let worker = ExportWorker {
            provider,
            enumerator,
            synthesizer: EventSynthesizer::new(Arc::clone(&health)),
            health,
            queue,
            exporters,
            config_rx,
            cancel: cancel.clone(),
            status_tx,
            source: source.into(),
            previous: None,
            last_heartbeat: Instant::now(),
        };
        let join = tokio::spawn(worker.run());
        WorkerHandle {
            cancel,
            join,
            status_rx,
        }
    }

    async fn run(mut self) {
        let _ = self.status_tx.send(WorkerState::Running);
        info!("export worker started");

        loop {
            let config = self.config_rx.borrow().clone();
            if !config.sampling_enabled() {
                // Interval dropped to zero: finish without a drain.
                info!("sampling disabled, export worker exiting");
                let _ = self.status_tx.send(WorkerState::Stopped);
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(config.sampling_interval) => {}
                _ = self.cancel.cancelled() => break,
            }

            self.run_iteration(&config).await;
        }

        // Shutdown: one final unconditional drain-and-export.
        let _ = self.status_tx.send(WorkerState::Draining);
        let config = self.config_rx.borrow().clone();
        let batch = self.queue.drain_all();
        if config.exporters_enabled {
            self.exporters.export_events(&batch).await;
        }
        let _ = self.status_tx.send(WorkerState::Terminated);
        info!("export worker terminated");
    }

    /// One sampling iteration. Every step isolates its own failures so the
    /// loop itself can never die here.
    async fn run_iteration(&mut self, config: &AgentConfig) {
        debug!("export iteration starting");

        match self.provider.node_stats().await {
            Ok(stats) => {
                if config.exporters_enabled {
                    self.exporters.export_node_stats(&stats).await;
                }
            }
            Err(e) => warn!("skipping node stats this iteration: {e}"),
        }

        if config.export_shard_stats {
            if let Some(enumerator) = &self.enumerator {
                match enumerator.started_shards(&config.index_patterns).await {
                    Ok(shards) => {
                        if config.exporters_enabled {
                            self.exporters.export_shard_stats(&shards).await;
                        }
                    }
                    Err(e) => warn!("skipping shard stats this iteration: {e}"),
                }
            }
        }

        let current = match self.provider.cluster_state().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("skipping cluster-state diff this iteration: {e}");
                None
            }
        };
        let is_master = current
            .as_ref()
            .map(ClusterState::local_node_is_master)
            .unwrap_or(false);

        if let Some(current) = current {
            if is_master {
                let previous = self
                    .previous
                    .take()
                    .unwrap_or_else(|| ClusterState::empty(&current.cluster_name));
                let events = self.synthesizer.diff(&previous, &current, &self.source);
                if !events.is_empty() {
                    debug!("diff produced {} events", events.len());
                }
                for event in events {
                    self.queue.enqueue(event);
                }
            }
            self.previous = Some(current);
        }

        let batch = self.queue.drain_all();
        if config.exporters_enabled {
            self.exporters.export_events(&batch).await;
        }

        if is_master {
            self.export_master_stats(config).await;
            self.maybe_heartbeat(config);
        }
    }

    async fn export_master_stats(&mut self, config: &AgentConfig) {
        let indices = self.provider.concrete_indices(&config.index_patterns);
        if indices.is_empty() {
            debug!(
                "no indices match patterns [{}]",
                join_patterns(&config.index_patterns)
            );
        } else {
            match self.provider.indices_stats(&indices).await {
                Ok(stats) => {
                    if config.exporters_enabled {
                        self.exporters.export_indices_stats(&stats).await;
                    }
                }
                Err(e) => warn!("skipping indices stats this iteration: {e}"),
            }
        }

        match self.provider.cluster_stats().await {
            Ok(stats) => {
                if config.exporters_enabled {
                    self.exporters.export_cluster_stats(&stats).await;
                }
            }
            Err(e) => warn!("skipping cluster stats this iteration: {e}"),
        }
    }

    /// Liveness snapshot on quiet clusters. The heartbeat is enqueued, not
    /// exported inline, so it ships with the NEXT iteration's drain.
    fn maybe_heartbeat(&mut self, config: &AgentConfig) {
        if !config.heartbeat_enabled() || self.last_heartbeat.elapsed() < config.heartbeat_interval
        {
            return;
        }
        let Some(state) = &self.previous else {
            return;
        };
        let health = self.health.compute_health(state);
        self.queue.enqueue(Event::new(
            now_ms(),
            &state.cluster_name,
            &self.source,
            EventKind::ClusterStateSnapshot {
                status: health.status,
                reason: "heartbeat".to_string(),
                state: Arc::new(state.clone()),
            },
        ));
        self.last_heartbeat = Instant::now();
        debug!("heartbeat snapshot enqueued");
    }
}
