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

//! Message records and per-operation options passed through the transport seam.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content type stamped on every simplified write.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Field table used for headers and extra arguments.
pub type FieldTable = Map<String, Value>;

/// Basic properties carried by a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: FieldTable,
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<u64>,
    pub r#type: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
}

/// Options for `publish` and `send_to_queue`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishOptions {
    #[serde(flatten)]
    pub properties: MessageProperties,
    pub mandatory: bool,
    pub persistent: bool,
}

impl PublishOptions {
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetOptions {
    pub no_ack: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumeOptions {
    pub consumer_tag: Option<String>,
    pub no_local: bool,
    pub no_ack: bool,
    pub exclusive: bool,
    pub priority: Option<i32>,
    pub arguments: FieldTable,
}

/// Broker reply to a successful consume registration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsumeOk {
    pub consumer_tag: String,
}

/// Transport-level fields of a delivered message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeliveryFields {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    /// Set on pushed deliveries.
    pub consumer_tag: Option<String>,
    /// Set on fetched deliveries: messages left in the queue.
    pub message_count: Option<u32>,
}

/// The original message record as received from the broker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delivery {
    pub fields: DeliveryFields,
    pub properties: MessageProperties,
    pub content: Vec<u8>,
}

impl Delivery {
    pub fn delivery_tag(&self) -> u64 {
        self.fields.delivery_tag
    }
}
