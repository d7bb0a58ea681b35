// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cluster monitoring agent.
//!
//! Polls a clustered system's state on an interval, diffs successive
//! snapshots into domain events (node join/leave, master election, shard
//! transitions, health changes) and fans events and stats out to a fixed set
//! of exporters, isolating each exporter's failures from the rest.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod exporter;
pub mod health;
pub mod listener;
pub mod provider;
pub mod queue;
pub mod state;
pub mod stats;
pub mod synthesizer;
pub mod util;
pub mod worker;
