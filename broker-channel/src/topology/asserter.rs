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
use crate::observability::events;
use crate::topology::spec::TopologySpec;
use crate::transport::BrokerChannel;
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "topology_asserter";

/// Applies every tuple of `spec` on `channel` and waits for all replies.
///
/// The whole specification is resolved before the first RPC goes out, so an
/// unknown operation name fails without touching the broker. RPCs then run
/// concurrently. On any failure the channel is closed once and the error is
/// returned: `Error::Configuration` for a bad specification, or
/// `Error::Assertion` holding the broker's own error.
pub async fn assert_topology(channel: &dyn BrokerChannel, spec: &TopologySpec) -> Result<(), Error> {
    let commands = match spec.resolve(|operation| channel.supports(operation)) {
        Ok(commands) => commands,
        Err(err) => {
            error!(
                event = events::TOPOLOGY_CONFIG_INVALID,
                component = COMPONENT,
                err = %err,
                "channel assertions rejected before any RPC"
            );
            close_after_failure(channel).await;
            return Err(err);
        }
    };

    info!(
        event = events::TOPOLOGY_ASSERT_START,
        component = COMPONENT,
        rpc_count = commands.len(),
        "asserting channel topology"
    );

    let pending = commands.iter().map(|command| async move {
        debug!(
            component = COMPONENT,
            operation = command.operation().name(),
            command = ?command,
            "issuing topology rpc"
        );
        channel.apply(command).await.map_err(|err| (command, err))
    });

    match try_join_all(pending).await {
        Ok(_) => {
            info!(
                event = events::TOPOLOGY_ASSERT_OK,
                component = COMPONENT,
                rpc_count = commands.len(),
                "channel assertions succeeded"
            );
            Ok(())
        }
        Err((command, err)) => {
            error!(
                event = events::TOPOLOGY_RPC_FAILED,
                component = COMPONENT,
                operation = command.operation().name(),
                command = ?command,
                err = %err,
                "channel assertions failed"
            );
            close_after_failure(channel).await;
            Err(Error::Assertion(err))
        }
    }
}

async fn close_after_failure(channel: &dyn BrokerChannel) {
    if let Err(err) = channel.close().await {
        warn!(
            event = events::CHANNEL_CLOSE_FAILED,
            component = COMPONENT,
            err = %err,
            "unable to close channel after failed assertions"
        );
    }
}
