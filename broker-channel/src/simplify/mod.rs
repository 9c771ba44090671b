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

//! JSON-in, JSON-out view over a raw confirm channel.

mod consumer;
mod json_channel;
mod write_outcome;

pub use consumer::MessageHandler;
pub use json_channel::JsonChannel;
pub use write_outcome::WriteOutcome;

use crate::error::Error;
use crate::message::Delivery;
use crate::transport::BrokerChannel;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Turns a channel into a [`JsonChannel`].
///
/// A raw channel is wrapped at most once while its wrapper is alive, and
/// simplifying a [`JsonChannel`] hands back the same instance, so no channel
/// ever gets a second set of flow-control listeners.
pub trait Simplify {
    fn simplify(self: Arc<Self>) -> Arc<JsonChannel>;
}

/// The [`JsonChannel`] currently built over one raw channel.
///
/// Each [`BrokerChannel`] owns one and returns it from
/// [`BrokerChannel::simplified_slot`].
#[derive(Default)]
pub struct SimplifiedSlot {
    wrapper: Mutex<Weak<JsonChannel>>,
}

impl Simplify for dyn BrokerChannel {
    fn simplify(self: Arc<Self>) -> Arc<JsonChannel> {
        let mut wrapper = self
            .simplified_slot()
            .wrapper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = wrapper.upgrade() {
            return existing;
        }
        let simplified = JsonChannel::wrap(self.clone());
        *wrapper = Arc::downgrade(&simplified);
        simplified
    }
}

impl Simplify for JsonChannel {
    fn simplify(self: Arc<Self>) -> Arc<JsonChannel> {
        self
    }
}

pub(crate) fn decode_delivery<T: DeserializeOwned>(delivery: &Delivery) -> Result<T, Error> {
    serde_json::from_slice(&delivery.content).map_err(Error::Decode)
}
