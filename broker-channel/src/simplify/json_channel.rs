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

use crate::error::{BrokerError, Error};
use crate::events::{ChannelLogger, ConsumerCancelled, EventHub, HubForwarder};
use crate::flow_control::FlowControl;
use crate::message::{
    ConsumeOk, ConsumeOptions, Delivery, GetOptions, PublishOptions, JSON_CONTENT_TYPE,
};
use crate::observability::{events, fields};
use crate::simplify::consumer::{JsonConsumer, MessageHandler};
use crate::simplify::decode_delivery;
use crate::simplify::write_outcome::WriteOutcome;
use crate::transport::{BrokerChannel, BrokerConsumer, ChannelListener, ConfirmCallback};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "json_channel";

/// A ready channel whose payloads are JSON values instead of raw bytes.
///
/// Built once per underlying channel, see [`Simplify`](crate::Simplify). Writes
/// return a [`WriteOutcome`]; reads hand back the decoded payload together with
/// the original [`Delivery`].
pub struct JsonChannel {
    inner: Arc<dyn BrokerChannel>,
    hub: Arc<EventHub>,
    flow_control: FlowControl,
}

impl JsonChannel {
    /// Wraps `inner` and attaches the flow-control tracker and error logging
    /// before the wrapper is returned.
    pub(crate) fn wrap(inner: Arc<dyn BrokerChannel>) -> Arc<Self> {
        let hub = Arc::new(EventHub::default());
        let (flow_control, flow_listener) = FlowControl::new();
        hub.register(flow_listener);
        hub.register(Arc::new(ChannelLogger));
        inner.register_listener(Arc::new(HubForwarder {
            hub: Arc::downgrade(&hub),
        }));

        Arc::new(Self {
            inner,
            hub,
            flow_control,
        })
    }

    /// The raw channel, for operations this wrapper does not cover.
    pub fn inner(&self) -> &Arc<dyn BrokerChannel> {
        &self.inner
    }

    /// Whether the broker currently asks publishers to pause.
    pub fn is_blocked(&self) -> bool {
        self.flow_control.is_blocked()
    }

    pub fn flow_control(&self) -> FlowControl {
        self.flow_control.clone()
    }

    /// Receives transport events plus synthesized `Cancelled` events.
    pub fn register_listener(&self, listener: Arc<dyn ChannelListener>) {
        self.hub.register(listener);
    }

    /// Publishes `payload` as JSON to `exchange` with `routing_key`.
    pub fn publish<T>(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &T,
        options: PublishOptions,
    ) -> Result<WriteOutcome, Error>
    where
        T: Serialize + ?Sized,
    {
        let (content, options) = encode(payload, options, exchange, routing_key)?;
        let (exchange_field, routing_key_field) = (exchange.to_string(), routing_key.to_string());

        Ok(WriteOutcome::from_write(|confirm| {
            let confirm = log_rejection(exchange_field, routing_key_field, confirm);
            self.inner
                .publish(exchange, routing_key, content, options, confirm)
        }))
    }

    /// Publishes `payload` as JSON straight to `queue`.
    pub fn send_to_queue<T>(
        &self,
        queue: &str,
        payload: &T,
        options: PublishOptions,
    ) -> Result<WriteOutcome, Error>
    where
        T: Serialize + ?Sized,
    {
        let (content, options) = encode(payload, options, "", queue)?;
        let queue_field = queue.to_string();

        Ok(WriteOutcome::from_write(|confirm| {
            let confirm = log_rejection(String::new(), queue_field, confirm);
            self.inner.send_to_queue(queue, content, options, confirm)
        }))
    }

    /// Fetches and decodes one message; `None` when the queue is empty.
    pub async fn get<T>(
        &self,
        queue: &str,
        options: &GetOptions,
    ) -> Result<Option<(T, Delivery)>, Error>
    where
        T: DeserializeOwned,
    {
        let Some(delivery) = self.inner.get(queue, options).await.map_err(Error::Rpc)? else {
            return Ok(None);
        };

        match decode_delivery::<T>(&delivery) {
            Ok(payload) => Ok(Some((payload, delivery))),
            Err(err) => {
                warn!(
                    event = events::DELIVERY_DECODE_FAILED,
                    component = COMPONENT,
                    queue = queue,
                    delivery_tag = delivery.delivery_tag(),
                    err = %err,
                    "fetched message is not valid json"
                );
                Err(err)
            }
        }
    }

    /// Starts consuming `queue`, handing decoded payloads to `handler`.
    ///
    /// When the broker cancels the consumer the handler is not called; a
    /// [`ChannelEvent::Cancelled`](crate::ChannelEvent::Cancelled) carrying the
    /// registration is emitted to this channel's listeners instead.
    pub async fn consume<H>(
        &self,
        queue: &str,
        handler: Arc<H>,
        options: &ConsumeOptions,
    ) -> Result<ConsumeOk, Error>
    where
        H: MessageHandler,
    {
        let consumer: Arc<dyn BrokerConsumer> =
            JsonConsumer::new(queue, options, handler, self.hub.clone());
        self.inner
            .consume(queue, consumer, options)
            .await
            .map_err(Error::Rpc)
    }

    /// Registers a cancelled consumer again with its original arguments.
    pub async fn resubscribe(&self, cancelled: &ConsumerCancelled) -> Result<ConsumeOk, Error> {
        self.inner
            .consume(
                &cancelled.queue,
                cancelled.consumer.clone(),
                &cancelled.options,
            )
            .await
            .map_err(Error::Rpc)
    }

    pub async fn cancel(&self, consumer_tag: &str) -> Result<(), Error> {
        self.inner.cancel(consumer_tag).await.map_err(Error::Rpc)
    }

    pub async fn ack(&self, delivery: &Delivery) -> Result<(), Error> {
        self.inner
            .ack(delivery.delivery_tag(), false)
            .await
            .map_err(Error::Rpc)
    }

    pub async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), Error> {
        self.inner
            .nack(delivery.delivery_tag(), false, requeue)
            .await
            .map_err(Error::Rpc)
    }

    pub async fn close(&self) -> Result<(), Error> {
        self.inner.close().await.map_err(Error::Rpc)
    }
}

fn encode<T>(
    payload: &T,
    mut options: PublishOptions,
    exchange: &str,
    routing_key: &str,
) -> Result<(Vec<u8>, PublishOptions), Error>
where
    T: Serialize + ?Sized,
{
    let content = serde_json::to_vec(payload).map_err(|err| {
        warn!(
            event = events::WRITE_ENCODE_FAILED,
            component = COMPONENT,
            exchange = fields::name_or_none(exchange),
            routing_key = routing_key,
            err = %err,
            "payload is not serializable as json"
        );
        Error::Encode(err)
    })?;
    options.properties.content_type = Some(JSON_CONTENT_TYPE.to_string());
    Ok((content, options))
}

fn log_rejection(exchange: String, routing_key: String, confirm: ConfirmCallback) -> ConfirmCallback {
    Box::new(move |result: Result<(), BrokerError>| {
        if let Err(err) = &result {
            warn!(
                event = events::WRITE_NACKED,
                component = COMPONENT,
                exchange = fields::name_or_none(&exchange),
                routing_key = routing_key.as_str(),
                err = %err,
                "broker rejected write"
            );
        }
        confirm(result);
    })
}
