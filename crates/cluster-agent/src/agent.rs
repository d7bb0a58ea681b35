// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent lifecycle: wires the queue, listener, worker and exporters together
//! and owns dynamic reconfiguration.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::exporter::{Exporter, ExporterSet};
use crate::health::HealthCalculator;
use crate::listener::ShardStateListener;
use crate::provider::{ShardEnumerator, ShardStateSource, ShardSubscription, SnapshotProvider};
use crate::queue::EventQueue;
use crate::worker::{ExportWorker, WorkerHandle, WorkerState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

/// The monitoring agent. Construction never fails; when no exporters are
/// configured the agent silently stays disabled, per its contract of never
/// raising to the host after construction.
pub struct AgentService {
    provider: Arc<dyn SnapshotProvider>,
    enumerator: Option<Arc<dyn ShardEnumerator>>,
    health: Arc<dyn HealthCalculator>,
    shard_source: Option<Arc<dyn ShardStateSource>>,
    exporters: ExporterSet,
    queue: Arc<EventQueue>,
    sampling_enabled: Arc<AtomicBool>,
    config_tx: watch::Sender<AgentConfig>,
    cluster_name: String,
    source: String,
    worker: Mutex<Option<WorkerHandle>>,
    subscription: Mutex<Option<ShardSubscription>>,
    started: AtomicBool,
}

pub struct AgentServiceConfig {
    pub config: AgentConfig,
    pub provider: Arc<dyn SnapshotProvider>,
    pub health: Arc<dyn HealthCalculator>,
    pub enumerator: Option<Arc<dyn ShardEnumerator>>,
    pub shard_source: Option<Arc<dyn ShardStateSource>>,
    pub exporters: Vec<Arc<dyn Exporter>>,
    /// Cluster identifier stamped on listener-produced events.
    pub cluster_name: String,
    /// Label identifying this agent in event sources, e.g. "agent[node-a]".
    pub source: String,
}

impl AgentService {
    pub fn new(service_config: AgentServiceConfig) -> Self {
        let (config_tx, _config_rx) = watch::channel(service_config.config);
        AgentService {
            provider: service_config.provider,
            enumerator: service_config.enumerator,
            health: service_config.health,
            shard_source: service_config.shard_source,
            exporters: ExporterSet::new(service_config.exporters),
            queue: Arc::new(EventQueue::new()),
            sampling_enabled: Arc::new(AtomicBool::new(false)),
            config_tx,
            cluster_name: service_config.cluster_name,
            source: service_config.source,
            worker: Mutex::new(None),
            subscription: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Starts exporters, the worker loop and the shard-state subscription.
    /// With no exporters configured the agent stays disabled and returns Ok.
    pub async fn start(&self) -> Result<(), AgentError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AgentError::AlreadyStarted);
        }

        if self.exporters.is_empty() {
            warn!("no exporters configured, monitoring agent disabled");
            return Ok(());
        }

        self.exporters.start_all().await;

        {
            let mut subscription = self.subscription.lock().await;
            if let Some(source) = &self.shard_source {
                *subscription = Some(source.subscribe(self.shard_listener()));
            }
        }

        let config = self.config_tx.borrow().clone();
        if config.sampling_enabled() {
            self.spawn_worker().await;
        } else {
            info!("sampling interval is zero, worker not started");
        }

        Ok(())
    }

    /// Stops the worker (bounded by the shutdown timeout), unsubscribes the
    /// listener and releases the exporters.
    pub async fn stop(&self) -> Result<(), AgentError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(AgentError::NotRunning);
        }

        self.sampling_enabled.store(false, Ordering::Release);

        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.unsubscribe();
        }

        let shutdown_timeout = self.config_tx.borrow().shutdown_timeout;
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            handle.request_stop();
            if let Err(e) = handle.join(shutdown_timeout).await {
                // The task is abandoned; its final drain finishes detached.
                warn!("abandoning export worker: {e}");
            }
        }

        self.exporters.stop_all().await;
        self.exporters.close_all().await;
        info!("monitoring agent stopped");
        Ok(())
    }

    /// Applies a new configuration at runtime. Patterns and toggles take
    /// effect on the worker's next iteration; interval transitions across
    /// zero start or stop the worker.
    pub async fn update_config(&self, config: AgentConfig) {
        let enable = config.sampling_enabled();
        // Must store the value even while no worker holds a receiver.
        self.config_tx.send_replace(config);

        if !self.started.load(Ordering::SeqCst) || self.exporters.is_empty() {
            return;
        }

        if enable {
            // Re-arm the listener even when no spawn is needed; a rapid
            // disable/enable pair can leave the old worker running.
            self.sampling_enabled.store(true, Ordering::Release);
            let mut worker = self.worker.lock().await;
            let needs_spawn = worker.as_ref().map(WorkerHandle::is_finished).unwrap_or(true);
            if needs_spawn {
                drop(worker);
                self.spawn_worker().await;
                info!("sampling re-enabled, export worker restarted");
            }
        } else {
            // The running loop observes the zero interval and exits on its
            // own; the listener stops producing immediately.
            self.sampling_enabled.store(false, Ordering::Release);
        }
    }

    /// Handle for the host to report local shard lifecycle transitions.
    pub fn shard_listener(&self) -> ShardStateListener {
        ShardStateListener::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.sampling_enabled),
            &self.cluster_name,
            &self.source,
        )
    }

    pub async fn worker_state(&self) -> WorkerState {
        match self.worker.lock().await.as_ref() {
            Some(handle) => handle.state(),
            None => WorkerState::Stopped,
        }
    }

    async fn spawn_worker(&self) {
        let handle = ExportWorker::spawn(
            Arc::clone(&self.provider),
            self.enumerator.clone(),
            Arc::clone(&self.health),
            Arc::clone(&self.queue),
            self.exporters.clone(),
            self.config_tx.subscribe(),
            self.source.clone(),
        );
        self.sampling_enabled.store(true, Ordering::Release);
        *self.worker.lock().await = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::testing::RecordingExporter;
    use crate::health::RoutingHealthCalculator;
    use crate::listener::ShardTransition;
    use crate::provider::testing::MockProvider;
    use crate::state::{ClusterNode, ClusterState, ShardLifecycle, ShardRouting};
    use std::time::Duration;

    fn master_state() -> ClusterState {
        let mut state = ClusterState::empty("test-cluster");
        state
            .nodes
            .insert("a".into(), ClusterNode::new("a", "node-a", "addr"));
        state.local_node_id = Some("a".into());
        state.master_node_id = Some("a".into());
        state
    }

    fn service(config: AgentConfig, exporters: Vec<Arc<dyn Exporter>>) -> AgentService {
        AgentService::new(AgentServiceConfig {
            config,
            provider: Arc::new(MockProvider::new(master_state())),
            health: Arc::new(RoutingHealthCalculator),
            enumerator: None,
            shard_source: None,
            exporters,
            cluster_name: "test-cluster".into(),
            source: "agent[node-a]".into(),
        })
    }

    fn transition() -> ShardTransition {
        ShardTransition {
            shard: ShardRouting {
                index: "idx".into(),
                shard: 0,
                primary: true,
                state: ShardLifecycle::Started,
                node_id: Some("a".into()),
                relocating_node_id: None,
            },
            node: None,
            previous_state: Some(ShardLifecycle::Initializing),
            reason: "test".into(),
        }
    }

    #[tokio::test]
    async fn test_no_exporters_disables_agent() {
        let agent = service(AgentConfig::default(), Vec::new());
        agent.start().await.expect("start");
        assert_eq!(agent.worker_state().await, WorkerState::Stopped);

        // The listener discards transitions while disabled.
        let listener = agent.shard_listener();
        listener.shard_state_changed(transition());
        assert!(agent.queue.is_empty());

        agent.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let exporter: Arc<dyn Exporter> = Arc::new(RecordingExporter::new("rec", false));
        let agent = service(AgentConfig::default(), vec![exporter]);
        agent.start().await.expect("start");
        assert!(matches!(agent.start().await, Err(AgentError::AlreadyStarted)));
        agent.stop().await.expect("stop");
        assert!(matches!(agent.stop().await, Err(AgentError::NotRunning)));
    }

    #[tokio::test]
    async fn test_zero_interval_starts_no_worker_and_listener_discards() {
        let exporter: Arc<dyn Exporter> = Arc::new(RecordingExporter::new("rec", false));
        let config = AgentConfig {
            sampling_interval: Duration::ZERO,
            ..Default::default()
        };
        let agent = service(config, vec![exporter]);
        agent.start().await.expect("start");

        assert_eq!(agent.worker_state().await, WorkerState::Stopped);
        let listener = agent.shard_listener();
        listener.shard_state_changed(transition());
        assert!(agent.queue.is_empty());

        agent.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_listener_feeds_running_agent() {
        let recording = Arc::new(RecordingExporter::new("rec", false));
        let config = AgentConfig {
            sampling_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let agent = service(config, vec![Arc::clone(&recording) as Arc<dyn Exporter>]);
        agent.start().await.expect("start");

        let listener = agent.shard_listener();
        listener.shard_state_changed(transition());
        tokio::time::sleep(Duration::from_millis(50)).await;
        agent.stop().await.expect("stop");

        let events = recording.events.lock().expect("lock poisoned");
        assert!(events.iter().any(|e| e.kind.name() == "shard_started"));
    }

    #[tokio::test]
    async fn test_dynamic_interval_restart() {
        let exporter: Arc<dyn Exporter> = Arc::new(RecordingExporter::new("rec", false));
        let config = AgentConfig {
            sampling_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let agent = service(config, vec![exporter]);
        agent.start().await.expect("start");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(agent.worker_state().await, WorkerState::Running);

        // Lower the interval to zero; the worker exits on its own.
        agent
            .update_config(AgentConfig {
                sampling_interval: Duration::ZERO,
                ..Default::default()
            })
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(agent.worker_state().await, WorkerState::Stopped);

        // Raise it back; a fresh worker is spawned.
        agent
            .update_config(AgentConfig {
                sampling_interval: Duration::from_millis(10),
                ..Default::default()
            })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(agent.worker_state().await, WorkerState::Running);

        agent.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_config_retained_while_sampling_disabled() {
        let exporter: Arc<dyn Exporter> = Arc::new(RecordingExporter::new("rec", false));
        let config = AgentConfig {
            sampling_interval: Duration::ZERO,
            ..Default::default()
        };
        let agent = service(config, vec![exporter]);
        agent.start().await.expect("start");
        assert_eq!(agent.worker_state().await, WorkerState::Stopped);

        // No worker means no receiver; the update must still be stored.
        agent
            .update_config(AgentConfig {
                sampling_interval: Duration::from_millis(10),
                index_patterns: vec!["logs-*".to_string()],
                ..Default::default()
            })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(agent.worker_state().await, WorkerState::Running);
        assert_eq!(
            agent.config_tx.borrow().index_patterns,
            vec!["logs-*".to_string()]
        );

        agent.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_rapid_toggle_keeps_listener_enabled() {
        let recording = Arc::new(RecordingExporter::new("rec", false));
        let config = AgentConfig {
            sampling_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let agent = service(config.clone(), vec![Arc::clone(&recording) as Arc<dyn Exporter>]);
        agent.start().await.expect("start");

        // Disable and re-enable before the worker observes the zero; the
        // old worker keeps running and the listener must still produce.
        agent
            .update_config(AgentConfig {
                sampling_interval: Duration::ZERO,
                ..Default::default()
            })
            .await;
        agent.update_config(config).await;

        let listener = agent.shard_listener();
        listener.shard_state_changed(transition());
        tokio::time::sleep(Duration::from_millis(100)).await;
        agent.stop().await.expect("stop");

        let events = recording.events.lock().expect("lock poisoned");
        assert!(
            events.iter().any(|e| e.kind.name() == "shard_started"),
            "listener transition was dropped after a rapid interval toggle"
        );
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        use std::sync::atomic::AtomicUsize;

        struct CountingSource {
            subscribed: AtomicUsize,
            unsubscribed: Arc<AtomicUsize>,
        }

        impl ShardStateSource for CountingSource {
            fn subscribe(&self, _listener: ShardStateListener) -> ShardSubscription {
                self.subscribed.fetch_add(1, Ordering::SeqCst);
                let counter = Arc::clone(&self.unsubscribed);
                ShardSubscription::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }
        }

        let unsubscribed = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(CountingSource {
            subscribed: AtomicUsize::new(0),
            unsubscribed: Arc::clone(&unsubscribed),
        });
        let exporter: Arc<dyn Exporter> = Arc::new(RecordingExporter::new("rec", false));
        let agent = AgentService::new(AgentServiceConfig {
            config: AgentConfig {
                sampling_interval: Duration::from_millis(10),
                ..Default::default()
            },
            provider: Arc::new(MockProvider::new(master_state())),
            health: Arc::new(RoutingHealthCalculator),
            enumerator: None,
            shard_source: Some(Arc::clone(&source) as Arc<dyn ShardStateSource>),
            exporters: vec![exporter],
            cluster_name: "test-cluster".into(),
            source: "agent[node-a]".into(),
        });

        agent.start().await.expect("start");
        assert_eq!(source.subscribed.load(Ordering::SeqCst), 1);
        assert_eq!(unsubscribed.load(Ordering::SeqCst), 0);

        agent.stop().await.expect("stop");
        assert_eq!(unsubscribed.load(Ordering::SeqCst), 1);
    }
}
