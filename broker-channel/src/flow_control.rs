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

//! Tracks broker-initiated flow control (`blocked` / `unblocked`).

use crate::events::ChannelEvent;
use crate::observability::events;
use crate::transport::ChannelListener;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "flow_control";

/// Read side of the blocked flag. Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct FlowControl {
    blocked: Arc<AtomicBool>,
}

impl FlowControl {
    /// Creates a tracker and the listener that is its only writer.
    pub(crate) fn new() -> (Self, Arc<dyn ChannelListener>) {
        let blocked = Arc::new(AtomicBool::new(false));
        let listener = Arc::new(FlowControlListener {
            blocked: blocked.clone(),
        });
        (Self { blocked }, listener)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }
}

/// Sole writer of the blocked flag; one store per signal.
struct FlowControlListener {
    blocked: Arc<AtomicBool>,
}

#[async_trait]
impl ChannelListener for FlowControlListener {
    async fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Blocked { reason } => {
                warn!(
                    event = events::CHANNEL_BLOCKED,
                    component = COMPONENT,
                    reason = reason.as_str(),
                    "channel blocked"
                );
                self.blocked.store(true, Ordering::Release);
            }
            ChannelEvent::Unblocked => {
                info!(
                    event = events::CHANNEL_UNBLOCKED,
                    component = COMPONENT,
                    "channel unblocked"
                );
                self.blocked.store(false, Ordering::Release);
            }
            _ => {}
        }
    }
}
