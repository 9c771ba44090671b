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
use broker_channel::{
    BrokerChannel, BrokerConsumer, BrokerError, ChannelEvent, ChannelListener, ConfirmCallback,
    ConsumeOk, ConsumeOptions, Delivery, GetOptions, PublishOptions, SimplifiedSlot,
    TopologyCommand, TopologyOperation,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A write as the channel received it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedWrite {
    /// Empty for `send_to_queue`.
    pub exchange: String,
    /// The queue name for `send_to_queue`.
    pub routing_key: String,
    pub content: Vec<u8>,
    pub options: PublishOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedConsume {
    pub queue: String,
    pub consumer_tag: String,
    pub options: ConsumeOptions,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Settlement {
    Ack { delivery_tag: u64 },
    Nack { delivery_tag: u64, requeue: bool },
}

/// In-memory confirm channel.
///
/// Topology commands succeed unless a failure was scripted with
/// [`MockChannel::fail_on`]. Writes are acked synchronously unless
/// [`MockChannel::hold_confirms`] was called.
pub struct MockChannel {
    applied: Mutex<Vec<TopologyCommand>>,
    failures: Mutex<HashMap<TopologyOperation, BrokerError>>,
    unsupported: Mutex<HashSet<TopologyOperation>>,
    writes: Mutex<Vec<RecordedWrite>>,
    write_hint: AtomicBool,
    hold_confirms: AtomicBool,
    pending_confirms: Mutex<VecDeque<ConfirmCallback>>,
    gets: Mutex<VecDeque<Result<Option<Delivery>, BrokerError>>>,
    consumers: Mutex<Vec<(RecordedConsume, Arc<dyn BrokerConsumer>)>>,
    cancelled: Mutex<Vec<String>>,
    settlements: Mutex<Vec<Settlement>>,
    listeners: Mutex<Vec<Arc<dyn ChannelListener>>>,
    closes: AtomicUsize,
    simplified: SimplifiedSlot,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            unsupported: Mutex::new(HashSet::new()),
            writes: Mutex::new(Vec::new()),
            write_hint: AtomicBool::new(true),
            hold_confirms: AtomicBool::new(false),
            pending_confirms: Mutex::new(VecDeque::new()),
            gets: Mutex::new(VecDeque::new()),
            consumers: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            settlements: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            simplified: SimplifiedSlot::default(),
        }
    }

    /// Rejects every `operation` command with `error`.
    pub fn fail_on(&self, operation: TopologyOperation, error: BrokerError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn set_unsupported(&self, operation: TopologyOperation) {
        self.unsupported.lock().unwrap().insert(operation);
    }

    pub fn applied(&self) -> Vec<TopologyCommand> {
        self.applied.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Value returned by subsequent writes.
    pub fn set_write_hint(&self, ok: bool) {
        self.write_hint.store(ok, Ordering::SeqCst);
    }

    /// Keeps confirms pending until [`MockChannel::confirm_next`].
    pub fn hold_confirms(&self) {
        self.hold_confirms.store(true, Ordering::SeqCst);
    }

    /// Settles the oldest held write. Returns `false` when none is pending.
    pub fn confirm_next(&self, result: Result<(), BrokerError>) -> bool {
        let confirm = self.pending_confirms.lock().unwrap().pop_front();
        match confirm {
            Some(confirm) => {
                confirm(result);
                true
            }
            None => false,
        }
    }

    /// Drops every held confirm without firing it.
    pub fn drop_pending_confirms(&self) {
        self.pending_confirms.lock().unwrap().clear();
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn push_get(&self, response: Result<Option<Delivery>, BrokerError>) {
        self.gets.lock().unwrap().push_back(response);
    }

    pub fn consumes(&self) -> Vec<RecordedConsume> {
        self.consumers
            .lock()
            .unwrap()
            .iter()
            .map(|(consume, _)| consume.clone())
            .collect()
    }

    pub fn cancelled_tags(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        self.settlements.lock().unwrap().clone()
    }

    /// Pushes `delivery` to the consumer registered under `consumer_tag`;
    /// `None` simulates a broker-side cancel.
    pub async fn deliver(&self, consumer_tag: &str, delivery: Option<Delivery>) {
        let consumer = self
            .consumers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(consume, _)| consume.consumer_tag == consumer_tag)
            .map(|(_, consumer)| consumer.clone());
        match consumer {
            Some(consumer) => consumer.on_delivery(delivery).await,
            None => panic!("no consumer registered under {consumer_tag}"),
        }
    }

    /// Delivers `event` to every listener registered on this channel.
    pub async fn emit(&self, event: ChannelEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn record_write(&self, write: RecordedWrite, confirm: ConfirmCallback) -> bool {
        debug!(
            "mock write to exchange: {:?} routing_key: {:?}",
            write.exchange, write.routing_key
        );
        self.writes.lock().unwrap().push(write);
        if self.hold_confirms.load(Ordering::SeqCst) {
            self.pending_confirms.lock().unwrap().push_back(confirm);
        } else {
            confirm(Ok(()));
        }
        self.write_hint.load(Ordering::SeqCst)
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerChannel for MockChannel {
    fn supports(&self, operation: TopologyOperation) -> bool {
        !self.unsupported.lock().unwrap().contains(&operation)
    }

    async fn apply(&self, command: &TopologyCommand) -> Result<(), BrokerError> {
        debug!("mock apply: {command:?}");
        self.applied.lock().unwrap().push(command.clone());
        match self.failures.lock().unwrap().get(&command.operation()) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content: Vec<u8>,
        options: PublishOptions,
        confirm: ConfirmCallback,
    ) -> bool {
        self.record_write(
            RecordedWrite {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                content,
                options,
            },
            confirm,
        )
    }

    fn send_to_queue(
        &self,
        queue: &str,
        content: Vec<u8>,
        options: PublishOptions,
        confirm: ConfirmCallback,
    ) -> bool {
        self.record_write(
            RecordedWrite {
                exchange: String::new(),
                routing_key: queue.to_string(),
                content,
                options,
            },
            confirm,
        )
    }

    async fn get(
        &self,
        _queue: &str,
        _options: &GetOptions,
    ) -> Result<Option<Delivery>, BrokerError> {
        self.gets.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn consume(
        &self,
        queue: &str,
        consumer: Arc<dyn BrokerConsumer>,
        options: &ConsumeOptions,
    ) -> Result<ConsumeOk, BrokerError> {
        let mut consumers = self.consumers.lock().unwrap();
        let consumer_tag = options
            .consumer_tag
            .clone()
            .unwrap_or_else(|| format!("amq.ctag-{}", consumers.len() + 1));
        consumers.push((
            RecordedConsume {
                queue: queue.to_string(),
                consumer_tag: consumer_tag.clone(),
                options: options.clone(),
            },
            consumer,
        ));
        Ok(ConsumeOk { consumer_tag })
    }

    async fn cancel(&self, consumer_tag: &str) -> Result<(), BrokerError> {
        self.cancelled.lock().unwrap().push(consumer_tag.to_string());
        Ok(())
    }

    async fn ack(&self, delivery_tag: u64, _multiple: bool) -> Result<(), BrokerError> {
        self.settlements
            .lock()
            .unwrap()
            .push(Settlement::Ack { delivery_tag });
        Ok(())
    }

    async fn nack(
        &self,
        delivery_tag: u64,
        _multiple: bool,
        requeue: bool,
    ) -> Result<(), BrokerError> {
        self.settlements.lock().unwrap().push(Settlement::Nack {
            delivery_tag,
            requeue,
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn register_listener(&self, listener: Arc<dyn ChannelListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn simplified_slot(&self) -> &SimplifiedSlot {
        &self.simplified
    }
}
