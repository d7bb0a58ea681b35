// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Service coordinator for the cluster monitoring agent.
//!
//! Reads configuration from the environment, builds the configured
//! exporters and runs the agent behind a [`services::ServicesHandle`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod services;

pub use config::{ExporterKind, MonitorConfig};
pub use error::ServicesError;
pub use services::{init_logging, Collaborators, MonitorServices, ServiceStatus, ServicesHandle};
