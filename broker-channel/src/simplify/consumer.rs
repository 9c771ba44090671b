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

use crate::error::Error;
use crate::events::{ChannelEvent, ConsumerCancelled, EventHub};
use crate::message::{ConsumeOptions, Delivery};
use crate::observability::events;
use crate::simplify::decode_delivery;
use crate::transport::BrokerConsumer;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

const COMPONENT: &str = "json_consumer";

/// Receives decoded deliveries from [`JsonChannel::consume`](crate::JsonChannel::consume).
///
/// The original [`Delivery`] is passed along so it can be acked or nacked.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    type Payload: DeserializeOwned + Send + 'static;

    async fn on_message(&self, payload: Self::Payload, delivery: Delivery);

    /// Called instead of `on_message` when the body does not decode as `Payload`.
    async fn on_decode_error(&self, error: Error, delivery: Delivery) {
        warn!(
            event = events::DELIVERY_DECODE_FAILED,
            component = COMPONENT,
            delivery_tag = delivery.delivery_tag(),
            routing_key = delivery.fields.routing_key.as_str(),
            err = %error,
            "dropping delivery with undecodable payload"
        );
    }
}

/// Decodes raw deliveries for one consume registration.
pub(crate) struct JsonConsumer<H> {
    queue: String,
    options: ConsumeOptions,
    handler: Arc<H>,
    hub: Arc<EventHub>,
    this: Weak<JsonConsumer<H>>,
}

impl<H: MessageHandler> JsonConsumer<H> {
    pub(crate) fn new(
        queue: &str,
        options: &ConsumeOptions,
        handler: Arc<H>,
        hub: Arc<EventHub>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            queue: queue.to_string(),
            options: options.clone(),
            handler,
            hub,
            this: this.clone(),
        })
    }

    async fn cancelled(&self) {
        info!(
            event = events::CONSUMER_CANCELLED,
            component = COMPONENT,
            queue = self.queue.as_str(),
            "consumer cancelled by broker"
        );
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let consumer: Arc<dyn BrokerConsumer> = this;
        self.hub
            .emit(ChannelEvent::Cancelled(ConsumerCancelled {
                queue: self.queue.clone(),
                options: self.options.clone(),
                consumer,
            }))
            .await;
    }
}

#[async_trait]
impl<H: MessageHandler> BrokerConsumer for JsonConsumer<H> {
    async fn on_delivery(&self, delivery: Option<Delivery>) {
        let Some(delivery) = delivery else {
            self.cancelled().await;
            return;
        };
        match decode_delivery::<H::Payload>(&delivery) {
            Ok(payload) => self.handler.on_message(payload, delivery).await,
            Err(err) => self.handler.on_decode_error(err, delivery).await,
        }
    }
}
