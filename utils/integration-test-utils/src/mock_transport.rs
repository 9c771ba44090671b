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

use crate::mock_channel::MockChannel;
use async_trait::async_trait;
use broker_channel::{
    BrokerChannel, BrokerConnection, BrokerError, BrokerTransport, ConnectOptions,
    ConnectionEvent, ConnectionListener,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

type ChannelSetup = Box<dyn Fn(&MockChannel) + Send + Sync>;

/// Hands out [`MockConnection`]s and remembers every one of them.
pub struct MockTransport {
    attempts: AtomicUsize,
    failing_connects: AtomicUsize,
    fail_channel_creation: AtomicBool,
    channel_setup: Mutex<Option<ChannelSetup>>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
    options: Mutex<Vec<ConnectOptions>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failing_connects: AtomicUsize::new(0),
            fail_channel_creation: AtomicBool::new(false),
            channel_setup: Mutex::new(None),
            connections: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// The next `count` connect attempts fail with `ECONNREFUSED`.
    pub fn fail_next_connects(&self, count: usize) {
        self.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Connections created from now on refuse to open a channel.
    pub fn fail_channel_creation(&self, fail: bool) {
        self.fail_channel_creation.store(fail, Ordering::SeqCst);
    }

    /// Runs `setup` on every channel created from now on.
    pub fn configure_channels(&self, setup: impl Fn(&MockChannel) + Send + Sync + 'static) {
        *self.channel_setup.lock().unwrap() = Some(Box::new(setup));
    }

    /// Every connect call, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().unwrap().clone()
    }

    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.connections.lock().unwrap()[index].clone()
    }

    pub fn connect_options(&self) -> Vec<ConnectOptions> {
        self.options.lock().unwrap().clone()
    }

    fn new_channel(&self) -> Arc<MockChannel> {
        let channel = MockChannel::new();
        if let Some(setup) = self.channel_setup.lock().unwrap().as_ref() {
            setup(&channel);
        }
        Arc::new(channel)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerTransport for MockTransport {
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.options.lock().unwrap().push(options.clone());
        debug!("mock connect attempt {attempt} to {}", options.url);

        let refused = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrokerError::new("connect ECONNREFUSED"));
        }

        let connection = Arc::new(MockConnection {
            channel: self.new_channel(),
            fail_channel_creation: self.fail_channel_creation.load(Ordering::SeqCst),
            listeners: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        });
        self.connections.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

/// One connection with exactly one channel.
pub struct MockConnection {
    channel: Arc<MockChannel>,
    fail_channel_creation: bool,
    listeners: Mutex<Vec<Arc<dyn ConnectionListener>>>,
    closes: AtomicUsize,
}

impl MockConnection {
    pub fn channel(&self) -> Arc<MockChannel> {
        self.channel.clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Delivers `event` to every listener registered on this connection.
    pub async fn emit(&self, event: ConnectionEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }
}

#[async_trait]
impl BrokerConnection for MockConnection {
    async fn create_confirm_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        if self.fail_channel_creation {
            return Err(BrokerError::with_code(504, "CHANNEL_ERROR"));
        }
        Ok(self.channel.clone())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.emit(ConnectionEvent::Close(None)).await;
        Ok(())
    }

    fn register_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.lock().unwrap().push(listener);
    }
}
