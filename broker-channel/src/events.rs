/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Channel and connection events, and the fan-out hub that relays them.

use crate::error::BrokerError;
use crate::message::ConsumeOptions;
use crate::observability::events;
use crate::transport::{BrokerConsumer, ChannelListener};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock, Weak};
use tracing::{error, info};

const COMPONENT: &str = "channel_events";

/// Events observed on a channel.
///
/// Every variant except `Cancelled` is pushed by the transport; `Cancelled` is
/// raised by the JSON channel when the broker cancels one of its consumers.
#[derive(Clone, Debug)]
pub enum ChannelEvent {
    Error(BrokerError),
    Blocked { reason: String },
    Unblocked,
    /// The write buffer has room again after a write returned `false`.
    Drain,
    Close,
    Cancelled(ConsumerCancelled),
}

/// Events observed on a connection.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    /// `None` for a clean close.
    Close(Option<BrokerError>),
    Error(BrokerError),
}

/// Arguments of a consume registration the broker has cancelled.
///
/// Hand it to [`JsonChannel::resubscribe`](crate::JsonChannel::resubscribe) to
/// register the same consumer again.
#[derive(Clone)]
pub struct ConsumerCancelled {
    pub queue: String,
    pub options: ConsumeOptions,
    pub consumer: Arc<dyn BrokerConsumer>,
}

impl Debug for ConsumerCancelled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerCancelled")
            .field("queue", &self.queue)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Relays events to every registered listener, in registration order.
#[derive(Default)]
pub(crate) struct EventHub {
    listeners: RwLock<Vec<Arc<dyn ChannelListener>>>,
}

impl EventHub {
    pub(crate) fn register(&self, listener: Arc<dyn ChannelListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub(crate) async fn emit(&self, event: ChannelEvent) {
        // Snapshot so listeners may register further listeners while handling.
        let listeners: Vec<Arc<dyn ChannelListener>> = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }
}

/// Registered on the underlying channel so transport events reach the hub.
///
/// Goes quiet once the wrapper owning the hub is dropped.
pub(crate) struct HubForwarder {
    pub(crate) hub: Weak<EventHub>,
}

#[async_trait]
impl ChannelListener for HubForwarder {
    async fn on_event(&self, event: ChannelEvent) {
        if let Some(hub) = self.hub.upgrade() {
            hub.emit(event).await;
        }
    }
}

/// Logs channel errors and closes.
pub(crate) struct ChannelLogger;

#[async_trait]
impl ChannelListener for ChannelLogger {
    async fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Error(err) => {
                error!(
                    event = events::CHANNEL_ERROR,
                    component = COMPONENT,
                    err = %err,
                    "channel error"
                );
            }
            ChannelEvent::Close => {
                info!(
                    event = events::CHANNEL_CLOSED,
                    component = COMPONENT,
                    "channel closed"
                );
            }
            _ => {}
        }
    }
}
