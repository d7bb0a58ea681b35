// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{config::ExporterKind, config::MonitorConfig, error::ServicesError};
use cluster_agent::{
    agent::{AgentService, AgentServiceConfig},
    exporter::http::{HttpExporter, HttpExporterConfig},
    exporter::log::LogExporter,
    exporter::Exporter,
    health::HealthCalculator,
    provider::{ShardEnumerator, ShardStateSource, SnapshotProvider},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber at the configured log level.
///
/// Hosts call this once before starting the services. Hosts that already
/// install their own subscriber skip it.
pub fn init_logging(config: &MonitorConfig) -> Result<(), ServicesError> {
    let env_filter = format!("hyper=off,reqwest=off,{}", config.log_level);

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter)
                .map_err(|e| ServicesError::InvalidConfig(format!("log level: {e}")))?,
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ServicesError::Runtime(e.to_string()))?;

    Ok(())
}

/// Lifecycle phase of the monitoring agent behind a [`ServicesHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Exporters and agent are being wired up.
    Starting,
    /// The agent is sampling and exporting.
    Running,
    /// Shutdown was requested; the final drain may still be in flight.
    Stopping,
    /// The agent has stopped.
    Stopped,
}

/// External collaborators the host supplies: where snapshots come from and
/// how shard transitions are reported.
pub struct Collaborators {
    pub provider: Arc<dyn SnapshotProvider>,
    pub health: Arc<dyn HealthCalculator>,
    pub enumerator: Option<Arc<dyn ShardEnumerator>>,
    pub shard_source: Option<Arc<dyn ShardStateSource>>,
    /// Cluster identifier stamped on listener-produced events.
    pub cluster_name: String,
    /// Label identifying this node in event sources, e.g. "node-a".
    pub node_label: String,
}

/// Cloneable handle the host keeps after [`MonitorServices::start`]:
/// phase queries, a status subscription, and shutdown.
#[derive(Debug, Clone)]
pub struct ServicesHandle {
    status: Arc<RwLock<ServiceStatus>>,
    status_tx: broadcast::Sender<ServiceStatus>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ServicesHandle {
    pub async fn is_running(&self) -> bool {
        matches!(*self.status.read().await, ServiceStatus::Running)
    }

    /// Subscribe to lifecycle transitions.
    pub fn status_receiver(&self) -> broadcast::Receiver<ServiceStatus> {
        self.status_tx.subscribe()
    }

    /// Requests shutdown of the agent and its exporters. Idempotent;
    /// calling it on an already stopped handle is a no-op.
    pub async fn stop(&self) -> Result<(), ServicesError> {
        let mut status = self.status.write().await;
        if *status == ServiceStatus::Stopped {
            return Ok(());
        }

        *status = ServiceStatus::Stopping;
        drop(status);

        let _ = self.shutdown_tx.send(());

        Ok(())
    }
}

/// Builds the configured exporters, wires the agent to the host's
/// collaborators and runs the whole pipeline behind a [`ServicesHandle`].
pub struct MonitorServices {
    config: MonitorConfig,
    collaborators: Collaborators,
}

impl MonitorServices {
    pub fn new(config: MonitorConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Validates the configuration, builds the exporters and starts the
    /// agent on a background task, waiting briefly for it to come up.
    pub async fn start(self) -> Result<ServicesHandle, ServicesError> {
        self.config.validate()?;
        let exporters = build_exporters(&self.config)?;

        let status = Arc::new(RwLock::new(ServiceStatus::Starting));
        let (status_tx, _status_rx) = broadcast::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(16);

        let handle = ServicesHandle {
            status: Arc::clone(&status),
            status_tx: status_tx.clone(),
            shutdown_tx,
        };

        let status_on_exit = Arc::clone(&status);
        let status_for_run = Arc::clone(&status);
        tokio::spawn(async move {
            if let Err(e) = run_services(
                self.config,
                self.collaborators,
                exporters,
                shutdown_rx,
                status_for_run,
                status_tx,
            )
            .await
            {
                error!("Monitoring services error: {}", e);
            }
            // Every exit path lands on Stopped, error or not.
            *status_on_exit.write().await = ServiceStatus::Stopped;
        });

        // Bounded wait for the agent to report Running; a handle is returned
        // either way so the host can still observe and stop the task.
        for _ in 0..50 {
            if *status.read().await == ServiceStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        Ok(handle)
    }
}

async fn run_services(
    config: MonitorConfig,
    collaborators: Collaborators,
    exporters: Vec<Arc<dyn Exporter>>,
    mut shutdown_rx: broadcast::Receiver<()>,
    status: Arc<RwLock<ServiceStatus>>,
    status_tx: broadcast::Sender<ServiceStatus>,
) -> Result<(), ServicesError> {
    debug!("Starting cluster monitoring agent");

    if exporters.is_empty() {
        info!("No exporters configured; agent will stay disabled");
    }

    let agent = AgentService::new(AgentServiceConfig {
        config: config.agent_config(),
        provider: collaborators.provider,
        health: collaborators.health,
        enumerator: collaborators.enumerator,
        shard_source: collaborators.shard_source,
        exporters,
        cluster_name: collaborators.cluster_name,
        source: format!("monitoring-agent[{}]", collaborators.node_label),
    });
    agent
        .start()
        .await
        .map_err(|e| ServicesError::AgentStart(e.to_string()))?;

    *status.write().await = ServiceStatus::Running;
    let _ = status_tx.send(ServiceStatus::Running);
    info!(
        "Monitoring agent running (sampling every {}s)",
        config.sampling_interval_secs
    );

    // Parked until the handle requests shutdown.
    let _ = shutdown_rx.recv().await;
    info!("Shutting down monitoring services");

    if let Err(e) = agent.stop().await {
        error!("Error stopping monitoring agent: {}", e);
    }
    let _ = status_tx.send(ServiceStatus::Stopped);

    Ok(())
}

fn build_exporters(config: &MonitorConfig) -> Result<Vec<Arc<dyn Exporter>>, ServicesError> {
    let mut exporters: Vec<Arc<dyn Exporter>> = Vec::new();
    for kind in &config.exporters {
        match kind {
            ExporterKind::Log => exporters.push(Arc::new(LogExporter::default())),
            ExporterKind::Http => {
                let mut http_config =
                    HttpExporterConfig::new("http", config.http_endpoints.clone());
                http_config.timeout = Duration::from_secs(config.http_timeout_secs);
                let exporter = HttpExporter::new(http_config)
                    .map_err(|e| ServicesError::ExporterBuild(e.to_string()))?;
                exporters.push(Arc::new(exporter));
            }
        }
    }
    Ok(exporters)
}
