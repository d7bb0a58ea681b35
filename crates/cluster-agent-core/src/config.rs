// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ServicesError;
use cluster_agent::config::AgentConfig;
use std::env;
use std::time::Duration;

/// Which built-in exporters to wire at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterKind {
    Log,
    Http,
}

/// Configuration for the monitoring services
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sampling interval in seconds; zero disables the worker
    pub sampling_interval_secs: u64,
    /// Index patterns whose stats are collected (default: all)
    pub index_patterns: Vec<String>,
    /// Whether per-shard stats are exported
    pub export_shard_stats: bool,
    /// Heartbeat snapshot interval in seconds; zero disables
    pub heartbeat_interval_secs: u64,
    /// Whether exporters receive artifacts at all
    pub exporters_enabled: bool,
    /// Which exporters to construct
    pub exporters: Vec<ExporterKind>,
    /// Endpoints for the HTTP exporter, tried in order
    pub http_endpoints: Vec<String>,
    /// HTTP exporter request timeout in seconds
    pub http_timeout_secs: u64,
    /// Log level (e.g. trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval_secs: 10,
            index_patterns: vec!["_all".to_string()],
            export_shard_stats: false,
            heartbeat_interval_secs: 600,
            exporters_enabled: true,
            exporters: vec![ExporterKind::Log],
            http_endpoints: Vec::new(),
            http_timeout_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Create configuration from `MONITOR_*` environment variables
    pub fn from_env() -> Result<Self, ServicesError> {
        let defaults = MonitorConfig::default();

        let sampling_interval_secs = env::var("MONITOR_SAMPLING_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.sampling_interval_secs);
        let index_patterns = env::var("MONITOR_INDEX_PATTERNS")
            .ok()
            .map(|val| parse_list(&val))
            .filter(|patterns| !patterns.is_empty())
            .unwrap_or(defaults.index_patterns);
        let export_shard_stats = env::var("MONITOR_EXPORT_SHARD_STATS")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(defaults.export_shard_stats);
        let heartbeat_interval_secs = env::var("MONITOR_HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.heartbeat_interval_secs);
        let exporters_enabled = env::var("MONITOR_EXPORTERS_ENABLED")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.exporters_enabled);
        let exporters = match env::var("MONITOR_EXPORTERS") {
            Ok(val) => parse_exporters(&val)?,
            Err(_) => defaults.exporters,
        };
        let http_endpoints = env::var("MONITOR_HTTP_ENDPOINTS")
            .ok()
            .map(|val| parse_list(&val))
            .unwrap_or(defaults.http_endpoints);
        let http_timeout_secs = env::var("MONITOR_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.http_timeout_secs);
        let log_level = env::var("MONITOR_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            sampling_interval_secs,
            index_patterns,
            export_shard_stats,
            heartbeat_interval_secs,
            exporters_enabled,
            exporters,
            http_endpoints,
            http_timeout_secs,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ServicesError> {
        if self.exporters.contains(&ExporterKind::Http) && self.http_endpoints.is_empty() {
            return Err(ServicesError::InvalidConfig(
                "MONITOR_HTTP_ENDPOINTS must be set when the http exporter is enabled".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(ServicesError::InvalidConfig(
                "MONITOR_HTTP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ServicesError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// The agent-level view of this configuration.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            sampling_interval: Duration::from_secs(self.sampling_interval_secs),
            index_patterns: self.index_patterns.clone(),
            export_shard_stats: self.export_shard_stats,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            exporters_enabled: self.exporters_enabled,
            ..AgentConfig::default()
        }
    }
}

fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn parse_exporters(val: &str) -> Result<Vec<ExporterKind>, ServicesError> {
    parse_list(val)
        .iter()
        .map(|kind| match kind.to_lowercase().as_str() {
            "log" => Ok(ExporterKind::Log),
            "http" => Ok(ExporterKind::Http),
            other => Err(ServicesError::InvalidConfig(format!(
                "Unknown exporter kind '{other}'. Must be one of: log, http"
            ))),
        })
        .collect()
}
