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

use async_trait::async_trait;
use broker_channel::{ChannelEvent, ChannelListener, Delivery, Error, MessageHandler};
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use tracing::debug;

/// Stores every channel event it sees.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ChannelEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelListener for EventRecorder {
    async fn on_event(&self, event: ChannelEvent) {
        debug!("recorded channel event: {event:?}");
        self.events.lock().unwrap().push(event);
    }
}

/// Stores decoded payloads and the deliveries that failed to decode.
pub struct RecordingHandler<T> {
    messages: Mutex<Vec<(T, Delivery)>>,
    rejected: Mutex<Vec<Delivery>>,
}

impl<T: Clone> RecordingHandler<T> {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            rejected: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(T, Delivery)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn rejected(&self) -> Vec<Delivery> {
        self.rejected.lock().unwrap().clone()
    }
}

impl<T: Clone> Default for RecordingHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> MessageHandler for RecordingHandler<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Payload = T;

    async fn on_message(&self, payload: T, delivery: Delivery) {
        self.messages.lock().unwrap().push((payload, delivery));
    }

    async fn on_decode_error(&self, error: Error, delivery: Delivery) {
        debug!("recorded undecodable delivery: {error}");
        self.rejected.lock().unwrap().push(delivery);
    }
}
