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

//! Seam between the channel lifecycle and a broker client library.
//!
//! A transport adapter implements [`BrokerTransport`], [`BrokerConnection`] and
//! [`BrokerChannel`] on top of an AMQP client. Everything above this module only
//! speaks through these traits.

use crate::error::BrokerError;
use crate::events::{ChannelEvent, ConnectionEvent};
use crate::message::{ConsumeOk, ConsumeOptions, Delivery, GetOptions, PublishOptions};
use crate::simplify::SimplifiedSlot;
use crate::topology::{TopologyCommand, TopologyOperation};
use crate::url::BrokerUrl;
use async_trait::async_trait;
use std::sync::Arc;

/// Invoked exactly once with the broker's verdict on a confirm-mode write.
pub type ConfirmCallback = Box<dyn FnOnce(Result<(), BrokerError>) + Send + 'static>;

/// Parameters for opening a connection.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectOptions {
    pub url: BrokerUrl,
    /// Hostname sent during TLS negotiation (SNI).
    pub servername: String,
}

impl ConnectOptions {
    /// Uses `servername` when given, otherwise the URL host.
    pub fn new(url: BrokerUrl, servername: Option<String>) -> Self {
        let servername = servername.unwrap_or_else(|| url.host.clone());
        Self { url, servername }
    }
}

#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn connect(&self, options: &ConnectOptions)
        -> Result<Arc<dyn BrokerConnection>, BrokerError>;
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn create_confirm_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;

    fn register_listener(&self, listener: Arc<dyn ConnectionListener>);
}

#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Whether this channel can perform `operation`. Defaults to every operation.
    fn supports(&self, _operation: TopologyOperation) -> bool {
        true
    }

    /// Issues one topology RPC and waits for the broker's reply.
    async fn apply(&self, command: &TopologyCommand) -> Result<(), BrokerError>;

    /// Writes a message and returns `false` when the write buffer is full.
    ///
    /// `confirm` fires once the broker acks or nacks the message.
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content: Vec<u8>,
        options: PublishOptions,
        confirm: ConfirmCallback,
    ) -> bool;

    /// Same as [`BrokerChannel::publish`] through the default exchange.
    fn send_to_queue(
        &self,
        queue: &str,
        content: Vec<u8>,
        options: PublishOptions,
        confirm: ConfirmCallback,
    ) -> bool;

    /// Fetches one message, `None` when the queue is empty.
    async fn get(&self, queue: &str, options: &GetOptions)
        -> Result<Option<Delivery>, BrokerError>;

    async fn consume(
        &self,
        queue: &str,
        consumer: Arc<dyn BrokerConsumer>,
        options: &ConsumeOptions,
    ) -> Result<ConsumeOk, BrokerError>;

    async fn cancel(&self, consumer_tag: &str) -> Result<(), BrokerError>;

    async fn ack(&self, delivery_tag: u64, multiple: bool) -> Result<(), BrokerError>;

    async fn nack(&self, delivery_tag: u64, multiple: bool, requeue: bool)
        -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;

    fn register_listener(&self, listener: Arc<dyn ChannelListener>);

    /// Where the [`JsonChannel`](crate::JsonChannel) built over this channel is recorded.
    fn simplified_slot(&self) -> &SimplifiedSlot;
}

/// Receives pushed deliveries for one consumer.
#[async_trait]
pub trait BrokerConsumer: Send + Sync {
    /// `None` means the broker cancelled the consumer.
    async fn on_delivery(&self, delivery: Option<Delivery>);
}

#[async_trait]
pub trait ChannelListener: Send + Sync {
    async fn on_event(&self, event: ChannelEvent);
}

#[async_trait]
pub trait ConnectionListener: Send + Sync {
    async fn on_event(&self, event: ConnectionEvent);
}
