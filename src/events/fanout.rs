// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External fan-out channel for cache invalidation.
//!
//! Messages are published per topic name. Delivery is fire-and-forget; a
//! channel with no subscribers drops the message.

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutMessage {
    pub channel: String,
    pub message: String,
}

pub trait FanOut: Send + Sync {
    fn publish(&self, channel: &str, message: String);
}

/// Tokio broadcast channel; slow subscribers lose the oldest messages.
pub struct BroadcastFanOut {
    sender: broadcast::Sender<FanOutMessage>,
}

impl BroadcastFanOut {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FanOutMessage> {
        self.sender.subscribe()
    }
}

impl FanOut for BroadcastFanOut {
    fn publish(&self, channel: &str, message: String) {
        let delivered = self
            .sender
            .send(FanOutMessage {
                channel: channel.to_string(),
                message,
            })
            .unwrap_or(0);
        tracing::trace!(channel = %channel, subscribers = delivered, "Fan-out published");
    }
}
