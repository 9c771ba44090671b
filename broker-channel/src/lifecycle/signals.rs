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

use crate::observability::events;
use tracing::warn;

const COMPONENT: &str = "channel_supervisor";

/// Resolves with the signal name once SIGINT or SIGTERM arrives.
///
/// Never resolves when no signal listener could be installed.
pub(crate) async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                return tokio::select! {
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                    _ = terminate.recv() => "SIGTERM",
                };
            }
            Err(err) => {
                warn!(
                    event = events::SUPERVISOR_SIGNAL_INSTALL_FAILED,
                    component = COMPONENT,
                    signal = "SIGTERM",
                    err = %err,
                    "unable to listen for SIGTERM"
                );
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(err) => {
            warn!(
                event = events::SUPERVISOR_SIGNAL_INSTALL_FAILED,
                component = COMPONENT,
                signal = "SIGINT",
                err = %err,
                "unable to listen for SIGINT"
            );
            std::future::pending().await
        }
    }
}
