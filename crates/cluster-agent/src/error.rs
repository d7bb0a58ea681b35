// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced by the agent's lifecycle operations. Runtime failures
/// inside the export loop never reach the host; they only appear in logs.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent already started")]
    AlreadyStarted,

    #[error("agent not running")]
    NotRunning,

    #[error("worker did not terminate within the shutdown timeout")]
    ShutdownTimeout,
}
