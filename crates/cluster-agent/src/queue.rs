// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Unbounded multi-producer / single-consumer event buffer.
//!
//! Producers are the event synthesizer (on the worker task) and the
//! shard-state listener (on arbitrary host threads); the export worker is the
//! sole consumer. Enqueue never blocks beyond the short critical section, so
//! it is safe to call from host notification paths.

use crate::event::Event;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    /// Appends an event. Never blocks and never fails; the queue is
    /// unbounded and applies no backpressure.
    pub fn enqueue(&self, event: Event) {
        #[allow(clippy::expect_used)]
        self.inner.lock().expect("lock poisoned").push_back(event);
    }

    /// Removes and returns every event present at the moment of the call,
    /// preserving per-producer enqueue order.
    pub fn drain_all(&self) -> Vec<Event> {
        #[allow(clippy::expect_used)]
        let mut queue = self.inner.lock().expect("lock poisoned");
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::expect_used)]
        self.inner.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
