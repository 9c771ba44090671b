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

//! One connect, channel, simplify and topology pass.

use crate::error::Error;
use crate::observability::events;
use crate::simplify::{JsonChannel, Simplify};
use crate::topology::{assert_topology, TopologySpec};
use crate::transport::{BrokerConnection, BrokerTransport, ConnectOptions};
use std::sync::Arc;
use tracing::{error, info, warn};

const COMPONENT: &str = "channel_setup";

/// A connection together with the ready channel derived from it.
pub(crate) struct EstablishedChannel {
    pub(crate) connection: Arc<dyn BrokerConnection>,
    pub(crate) channel: Arc<JsonChannel>,
}

/// Connects, opens a confirm channel, attaches flow control and asserts the
/// topology.
///
/// The connection is closed again when any later step fails, so a failed
/// attempt leaves nothing open behind it.
pub(crate) async fn establish(
    transport: &dyn BrokerTransport,
    options: &ConnectOptions,
    topology: &TopologySpec,
) -> Result<EstablishedChannel, Error> {
    info!(
        event = events::CONNECT_START,
        component = COMPONENT,
        broker = %options.url,
        servername = options.servername.as_str(),
        "connecting to broker"
    );

    let connection = transport.connect(options).await.map_err(|err| {
        error!(
            event = events::CONNECT_FAILED,
            component = COMPONENT,
            broker = %options.url,
            err = %err,
            "unable to connect to broker"
        );
        Error::Connection(err)
    })?;

    let raw_channel = match connection.create_confirm_channel().await {
        Ok(channel) => channel,
        Err(err) => {
            error!(
                event = events::CHANNEL_CREATE_FAILED,
                component = COMPONENT,
                broker = %options.url,
                err = %err,
                "unable to open confirm channel"
            );
            close_connection(connection.as_ref()).await;
            return Err(Error::Connection(err));
        }
    };

    let channel = Simplify::simplify(raw_channel);

    if let Err(err) = assert_topology(channel.inner().as_ref(), topology).await {
        close_connection(connection.as_ref()).await;
        return Err(err);
    }

    info!(
        event = events::CONNECT_OK,
        component = COMPONENT,
        broker = %options.url,
        topology_entries = topology.len(),
        "channel ready"
    );

    Ok(EstablishedChannel {
        connection,
        channel,
    })
}

async fn close_connection(connection: &dyn BrokerConnection) {
    if let Err(err) = connection.close().await {
        warn!(
            event = events::CONNECTION_CLOSE_FAILED,
            component = COMPONENT,
            err = %err,
            "unable to close connection after failed setup"
        );
    }
}
