// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur when coordinating the monitoring services
#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build exporter: {0}")]
    ExporterBuild(String),

    #[error("Failed to start monitoring agent: {0}")]
    AgentStart(String),

    #[error("Services already started")]
    AlreadyStarted,

    #[error("Services not running")]
    NotRunning,

    #[error("Shutdown timeout exceeded")]
    ShutdownTimeout,

    #[error("Runtime error: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServicesError::InvalidConfig("bad interval".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: bad interval");
    }

    #[test]
    fn test_all_error_variants() {
        // Ensure all variants can be constructed
        let _e1 = ServicesError::InvalidConfig("test".into());
        let _e2 = ServicesError::ExporterBuild("test".into());
        let _e3 = ServicesError::AgentStart("test".into());
        let _e4 = ServicesError::AlreadyStarted;
        let _e5 = ServicesError::NotRunning;
        let _e6 = ServicesError::ShutdownTimeout;
        let _e7 = ServicesError::Runtime("test".into());
    }
}
