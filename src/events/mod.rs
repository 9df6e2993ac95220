// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Bus
//!
//! In-process publish/subscribe between the write paths and their side
//! effects.
//!
//! ## Delivery
//!
//! - Topics are registered up front; emitting an unregistered topic fails.
//! - `emit` runs every handler matching the topic in registration order,
//!   on the caller's task, after the triggering write has committed.
//! - At-most-once: a failing handler is logged and skipped. Its error never
//!   reaches the emitter and nothing is retried.

pub mod fanout;
pub mod handlers;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::device::models::Device;

pub use fanout::{BroadcastFanOut, FanOut, FanOutMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Topic {
    AccountCreated,
    AccountDeleted,
    DeviceSaved,
    NftMinted,
    NftTransferred,
    NftMetadataUpdated,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::AccountDeleted,
        Topic::AccountCreated,
        Topic::DeviceSaved,
        Topic::NftMinted,
        Topic::NftTransferred,
        Topic::NftMetadataUpdated,
    ];

    /// Channel name, also used on the fan-out side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::AccountCreated => "account.created",
            Topic::AccountDeleted => "account.deleted",
            Topic::DeviceSaved => "device.saved",
            Topic::NftMinted => "nft.minted",
            // Subscribers already listen on this spelling.
            Topic::NftTransferred => "nft.transfered",
            Topic::NftMetadataUpdated => "nft.metadata.updated",
        }
    }

    /// Registration key of the built-in handler for this topic.
    pub fn handler_key(&self) -> String {
        format!("handlers:{}", self.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountEvent {
    pub profile_id: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSaved {
    pub device: Device,
    pub profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftEvent {
    pub did: String,
    /// Address the event concerns (minter, editor or receiver), when known.
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Account(AccountEvent),
    DeviceSaved(DeviceSaved),
    Nft(NftEvent),
}

impl EventPayload {
    /// Address whose cached chain state the event invalidates.
    pub fn address(&self) -> Option<&str> {
        match self {
            EventPayload::Account(e) => Some(&e.address),
            EventPayload::DeviceSaved(e) => Some(&e.device.address),
            EventPayload::Nft(e) => e.address.as_deref(),
        }
    }
}

/// One emitted event. Lives only for the duration of `emit`.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub topic: Topic,
    pub payload: EventPayload,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("topic {0} is not registered")]
    UnknownTopic(Topic),

    #[error("handler {0} is already registered")]
    DuplicateHandler(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(err: impl fmt::Display) -> Self {
        Self(err.to_string())
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

struct Registration {
    key: String,
    topic: Topic,
    handler: Arc<dyn EventHandler>,
}

#[derive(Default)]
pub struct EventBus {
    topics: RwLock<HashSet<Topic>>,
    handlers: RwLock<Vec<Registration>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_topics(&self, topics: &[Topic]) {
        if let Ok(mut registered) = self.topics.write() {
            registered.extend(topics.iter().copied());
        }
    }

    pub fn register_handler(
        &self,
        key: impl Into<String>,
        topic: Topic,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        let key = key.into();
        if !self.is_registered(topic) {
            return Err(BusError::UnknownTopic(topic));
        }

        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| BusError::DuplicateHandler(key.clone()))?;
        if handlers.iter().any(|r| r.key == key) {
            return Err(BusError::DuplicateHandler(key));
        }
        handlers.push(Registration { key, topic, handler });
        Ok(())
    }

    fn is_registered(&self, topic: Topic) -> bool {
        self.topics.read().map(|t| t.contains(&topic)).unwrap_or(false)
    }

    /// Dispatch to every handler of `topic`, in registration order.
    pub async fn emit(&self, topic: Topic, payload: EventPayload) -> Result<DomainEvent, BusError> {
        if !self.is_registered(topic) {
            return Err(BusError::UnknownTopic(topic));
        }

        let event = DomainEvent {
            id: Uuid::new_v4(),
            topic,
            payload,
            occurred_at: Utc::now(),
        };

        // Snapshot so handlers may emit in turn.
        let matching: Vec<(String, Arc<dyn EventHandler>)> = match self.handlers.read() {
            Ok(handlers) => handlers
                .iter()
                .filter(|r| r.topic == topic)
                .map(|r| (r.key.clone(), Arc::clone(&r.handler)))
                .collect(),
            Err(_) => Vec::new(),
        };

        for (key, handler) in matching {
            if let Err(e) = handler.handle(&event).await {
                tracing::error!(
                    topic = %topic,
                    handler = %key,
                    event_id = %event.id,
                    error = %e,
                    "Event handler failed"
                );
            }
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.topic));
            if self.fail {
                Err(HandlerError::new("boom"))
            } else {
                Ok(())
            }
        }
    }

    fn account_payload() -> EventPayload {
        EventPayload::Account(AccountEvent {
            profile_id: "3".to_string(),
            address: "0xabc".to_string(),
        })
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order_and_failures_are_isolated() {
        let bus = EventBus::new();
        bus.register_topics(&Topic::ALL);
        let log = Arc::new(Mutex::new(Vec::new()));

        for (name, fail) in [("first", true), ("second", false)] {
            bus.register_handler(
                format!("test:{name}"),
                Topic::AccountCreated,
                Arc::new(Recorder {
                    name,
                    log: Arc::clone(&log),
                    fail,
                }),
            )
            .unwrap();
        }
        bus.register_handler(
            "test:other",
            Topic::DeviceSaved,
            Arc::new(Recorder {
                name: "other",
                log: Arc::clone(&log),
                fail: false,
            }),
        )
        .unwrap();

        let event = bus.emit(Topic::AccountCreated, account_payload()).await.unwrap();
        assert_eq!(event.topic, Topic::AccountCreated);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:account.created", "second:account.created"]
        );
    }

    #[tokio::test]
    async fn unknown_topic_is_rejected() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.emit(Topic::NftMinted, account_payload()).await,
            Err(BusError::UnknownTopic(Topic::NftMinted))
        ));

        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(Recorder {
            name: "x",
            log,
            fail: false,
        });
        assert!(matches!(
            bus.register_handler("k", Topic::NftMinted, handler),
            Err(BusError::UnknownTopic(_))
        ));
    }

    #[test]
    fn duplicate_handler_keys_are_rejected() {
        let bus = EventBus::new();
        bus.register_topics(&Topic::ALL);
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = || {
            Arc::new(Recorder {
                name: "x",
                log: Arc::clone(&log),
                fail: false,
            })
        };

        let key = Topic::AccountDeleted.handler_key();
        bus.register_handler(&key, Topic::AccountDeleted, make()).unwrap();
        assert!(matches!(
            bus.register_handler(&key, Topic::AccountDeleted, make()),
            Err(BusError::DuplicateHandler(_))
        ));
    }

    #[test]
    fn topic_names() {
        assert_eq!(Topic::NftTransferred.as_str(), "nft.transfered");
        assert_eq!(Topic::DeviceSaved.handler_key(), "handlers:device.saved");
    }
}
