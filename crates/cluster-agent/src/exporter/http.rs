// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP exporter: ships artifacts as JSON to one of a list of endpoints.
//!
//! Endpoints are tried in order; the first successful delivery wins. There is
//! no retry beyond the failover walk, matching the fan-out contract.

use super::{Exporter, ExportError};
use crate::event::Event;
use crate::stats::{ClusterStats, IndicesStats, NodeStats, ShardStats};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpExporterConfig {
    pub name: String,
    /// Base URLs, e.g. `http://monitor-1:9200`. Tried in order.
    pub endpoints: Vec<String>,
    pub timeout: Duration,
}

impl HttpExporterConfig {
    pub fn new(name: impl Into<String>, endpoints: Vec<String>) -> Self {
        HttpExporterConfig {
            name: name.into(),
            endpoints,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct HttpExporter {
    name: String,
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl HttpExporter {
    pub fn new(config: HttpExporterConfig) -> Result<Self, ExportError> {
        if config.endpoints.is_empty() {
            return Err(ExportError::Destination(
                "no endpoints configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExportError::Destination(e.to_string()))?;
        Ok(HttpExporter {
            name: config.name,
            endpoints: config.endpoints,
            client,
        })
    }

    /// POSTs `body` to `{endpoint}/{path}`, walking the endpoint list until
    /// one accepts the payload.
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ExportError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| ExportError::Payload(e.to_string()))?;

        let mut last_error = String::new();
        for endpoint in &self.endpoints {
            let url = format!("{}/{}", endpoint.trim_end_matches('/'), path);
            match self
                .client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone())
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(exporter = %self.name, %url, "delivered {path}");
                    return Ok(());
                }
                Ok(response) => {
                    last_error = format!("{url}: unexpected status {}", response.status());
                    warn!(exporter = %self.name, "{last_error}, trying next endpoint");
                }
                Err(e) => {
                    last_error = format!("{url}: {e}");
                    warn!(exporter = %self.name, "{last_error}, trying next endpoint");
                }
            }
        }
        Err(ExportError::Destination(last_error))
    }
}

#[async_trait]
impl Exporter for HttpExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export_node_stats(&self, stats: &NodeStats) -> Result<(), ExportError> {
        self.post("node_stats", stats).await
    }

    async fn export_shard_stats(&self, stats: &[ShardStats]) -> Result<(), ExportError> {
        self.post("shard_stats", stats).await
    }

    async fn export_indices_stats(&self, stats: &IndicesStats) -> Result<(), ExportError> {
        self.post("indices_stats", stats).await
    }

    async fn export_cluster_stats(&self, stats: &ClusterStats) -> Result<(), ExportError> {
        self.post("cluster_stats", stats).await
    }

    async fn export_events(&self, events: &[Event]) -> Result<(), ExportError> {
        self.post("events", events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::util::now_ms;

    fn event() -> Event {
        Event::new(
            now_ms(),
            "test-cluster",
            "test",
            EventKind::IndexCreated { index: "idx".into() },
        )
    }

    #[tokio::test]
    async fn test_export_events_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create_async()
            .await;

        let exporter = HttpExporter::new(HttpExporterConfig::new(
            "http-test",
            vec![server.url()],
        ))
        .expect("exporter");
        exporter.export_events(&[event()]).await.expect("export");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failover_to_second_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .with_status(200)
            .create_async()
            .await;

        // First endpoint refuses connections; the second serves.
        let exporter = HttpExporter::new(HttpExporterConfig::new(
            "http-test",
            vec!["http://127.0.0.1:1".to_string(), server.url()],
        ))
        .expect("exporter");
        exporter.export_events(&[event()]).await.expect("export");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_endpoints_failing_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/node_stats")
            .with_status(503)
            .create_async()
            .await;

        let exporter = HttpExporter::new(HttpExporterConfig::new(
            "http-test",
            vec![server.url()],
        ))
        .expect("exporter");
        let stats = NodeStats {
            node: crate::state::ClusterNode::new("a", "node-a", "10.0.0.1:9300"),
            timestamp_ms: now_ms(),
            payload: serde_json::json!({}),
        };
        let result = exporter.export_node_stats(&stats).await;
        assert!(matches!(result, Err(ExportError::Destination(_))));

        mock.assert_async().await;
    }

    #[test]
    fn test_empty_endpoint_list_rejected() {
        let result = HttpExporter::new(HttpExporterConfig::new("http-test", Vec::new()));
        assert!(result.is_err());
    }
}
