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

//! Keeps one ready channel alive across connection losses.

use crate::config::ChannelConfig;
use crate::error::Error;
use crate::events::ConnectionEvent;
use crate::lifecycle::setup::{establish, EstablishedChannel};
use crate::lifecycle::signals;
use crate::observability::{events, fields};
use crate::simplify::JsonChannel;
use crate::topology::TopologySpec;
use crate::transport::{BrokerConnection, BrokerTransport, ConnectOptions, ConnectionListener};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "channel_supervisor";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SupervisorState {
    /// A setup attempt is in progress.
    Connecting,
    Ready,
    /// Waiting out the reconnect delay.
    Backoff,
    /// Shut down; no further reconnects happen.
    Closed,
}

/// Owns the connection and rebuilds it after loss.
///
/// The first setup runs inside [`ChannelSupervisor::start`] and its failure is
/// returned as is. After that, every close or error on the current connection
/// starts a reconnect loop: wait the configured delay, run the full setup
/// again, repeat until it succeeds. Retries are unbounded and the delay is
/// fixed.
#[derive(Clone)]
pub struct ChannelSupervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    transport: Arc<dyn BrokerTransport>,
    options: ConnectOptions,
    topology: TopologySpec,
    delay: Duration,
    channel: watch::Sender<Arc<JsonChannel>>,
    state: watch::Sender<SupervisorState>,
    current: Mutex<CurrentConnection>,
    reconnecting: AtomicBool,
    shutting_down: AtomicBool,
    signals_installed: AtomicBool,
}

/// The connection whose events may trigger a reconnect.
struct CurrentConnection {
    epoch: Uuid,
    connection: Arc<dyn BrokerConnection>,
}

/// Relays one connection's events, tagged with the epoch it was built in.
struct ConnectionObserver {
    epoch: Uuid,
    supervisor: Weak<SupervisorInner>,
}

#[async_trait]
impl ConnectionListener for ConnectionObserver {
    async fn on_event(&self, event: ConnectionEvent) {
        if let Some(supervisor) = self.supervisor.upgrade() {
            supervisor.connection_lost(self.epoch, event).await;
        }
    }
}

impl ChannelSupervisor {
    /// Runs the first setup and starts watching the resulting connection.
    pub async fn start(
        transport: Arc<dyn BrokerTransport>,
        config: ChannelConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let options = config.connect_options()?;
        let EstablishedChannel {
            connection,
            channel,
        } = establish(transport.as_ref(), &options, &config.topology).await?;

        let epoch = Uuid::new_v4();
        let (channel, _) = watch::channel(channel);
        let (state, _) = watch::channel(SupervisorState::Ready);
        let inner = Arc::new(SupervisorInner {
            transport,
            options,
            topology: config.topology.clone(),
            delay: config.reconnect_delay(),
            channel,
            state,
            current: Mutex::new(CurrentConnection {
                epoch,
                connection: connection.clone(),
            }),
            reconnecting: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            signals_installed: AtomicBool::new(false),
        });
        inner.observe(epoch, connection.as_ref());

        let supervisor = Self { inner };
        if config.handle_signals {
            supervisor.install_signal_handlers();
        }
        Ok(supervisor)
    }

    /// The most recently built channel.
    ///
    /// While a reconnect is pending this is the channel of the lost
    /// connection; operations on it fail until a new one replaces it.
    pub fn channel(&self) -> Arc<JsonChannel> {
        self.inner.channel.borrow().clone()
    }

    /// Yields every replacement channel.
    pub fn subscribe(&self) -> watch::Receiver<Arc<JsonChannel>> {
        self.inner.channel.subscribe()
    }

    pub fn state(&self) -> SupervisorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.inner.state.subscribe()
    }

    /// Closes the current connection and stops reconnecting.
    ///
    /// Only the first call closes anything; later calls return `Ok(())`.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.inner.shutdown().await
    }

    /// Shuts down on SIGINT or SIGTERM.
    ///
    /// Installs one listener task per supervisor no matter how often it is
    /// called or how many times the connection is rebuilt.
    pub fn install_signal_handlers(&self) {
        if self.inner.signals_installed.swap(true, Ordering::AcqRel) {
            return;
        }
        let supervisor = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let signal = signals::shutdown_signal().await;
            let Some(supervisor) = supervisor.upgrade() else {
                return;
            };
            info!(
                event = events::SUPERVISOR_SIGNAL,
                component = COMPONENT,
                signal = signal,
                "received shutdown signal"
            );
            if let Err(err) = supervisor.shutdown().await {
                warn!(
                    event = events::CONNECTION_CLOSE_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "unable to close connection on signal"
                );
            }
        });
    }
}

impl SupervisorInner {
    fn observe(self: &Arc<Self>, epoch: Uuid, connection: &dyn BrokerConnection) {
        connection.register_listener(Arc::new(ConnectionObserver {
            epoch,
            supervisor: Arc::downgrade(self),
        }));
    }

    async fn connection_lost(self: &Arc<Self>, epoch: Uuid, event: ConnectionEvent) {
        let cause = match &event {
            ConnectionEvent::Close(Some(err)) | ConnectionEvent::Error(err) => err.to_string(),
            ConnectionEvent::Close(None) => fields::NONE.to_string(),
        };

        if self.shutting_down.load(Ordering::Acquire) {
            debug!(
                event = events::SUPERVISOR_RECONNECT_SKIPPED,
                component = COMPONENT,
                epoch = %epoch,
                reason = fields::REASON_SHUTTING_DOWN,
                "ignoring connection event"
            );
            return;
        }

        if self.current.lock().await.epoch != epoch {
            debug!(
                event = events::SUPERVISOR_RECONNECT_SKIPPED,
                component = COMPONENT,
                epoch = %epoch,
                reason = fields::REASON_STALE_CONNECTION,
                "ignoring connection event"
            );
            return;
        }

        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                event = events::SUPERVISOR_RECONNECT_SKIPPED,
                component = COMPONENT,
                epoch = %epoch,
                reason = fields::REASON_ALREADY_RECONNECTING,
                "ignoring connection event"
            );
            return;
        }

        warn!(
            event = events::SUPERVISOR_CONNECTION_LOST,
            component = COMPONENT,
            epoch = %epoch,
            err = cause.as_str(),
            "connection lost"
        );
        tokio::spawn(self.clone().reconnect());
    }

    async fn reconnect(self: Arc<Self>) {
        while !self.shutting_down.load(Ordering::Acquire) {
            self.state.send_replace(SupervisorState::Backoff);
            info!(
                event = events::SUPERVISOR_BACKOFF,
                component = COMPONENT,
                delay_secs = self.delay.as_secs(),
                "waiting before reconnecting"
            );
            tokio::time::sleep(self.delay).await;
            if self.shutting_down.load(Ordering::Acquire) {
                break;
            }

            self.state.send_replace(SupervisorState::Connecting);
            match establish(self.transport.as_ref(), &self.options, &self.topology).await {
                Ok(established) => {
                    if let Some(epoch) = self.install(established).await {
                        info!(
                            event = events::SUPERVISOR_RECONNECT_OK,
                            component = COMPONENT,
                            epoch = %epoch,
                            "reconnected"
                        );
                        return;
                    }
                    break;
                }
                Err(err) => {
                    warn!(
                        event = events::SUPERVISOR_RECONNECT_FAILED,
                        component = COMPONENT,
                        err = %err,
                        "reconnect attempt failed"
                    );
                }
            }
        }

        if self.shutting_down.load(Ordering::Acquire) {
            self.state.send_replace(SupervisorState::Closed);
        }
        self.reconnecting.store(false, Ordering::Release);
    }

    /// Makes `established` the current connection, unless shutdown won the race.
    ///
    /// Clears the reconnect flag under the connection lock and before the new
    /// channel is published.
    async fn install(self: &Arc<Self>, established: EstablishedChannel) -> Option<Uuid> {
        let mut current = self.current.lock().await;
        if self.shutting_down.load(Ordering::Acquire) {
            drop(current);
            if let Err(err) = established.connection.close().await {
                warn!(
                    event = events::CONNECTION_CLOSE_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "unable to close connection opened during shutdown"
                );
            }
            return None;
        }

        let epoch = Uuid::new_v4();
        self.observe(epoch, established.connection.as_ref());
        *current = CurrentConnection {
            epoch,
            connection: established.connection,
        };
        self.reconnecting.store(false, Ordering::Release);
        self.channel.send_replace(established.channel);
        self.state.send_replace(SupervisorState::Ready);
        Some(epoch)
    }

    async fn shutdown(&self) -> Result<(), Error> {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let (epoch, connection) = {
            let current = self.current.lock().await;
            (current.epoch, current.connection.clone())
        };
        info!(
            event = events::SUPERVISOR_SHUTDOWN,
            component = COMPONENT,
            epoch = %epoch,
            "shutting down broker connection"
        );
        self.state.send_replace(SupervisorState::Closed);
        connection.close().await.map_err(Error::Connection)
    }
}
