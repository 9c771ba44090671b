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

mod mock_channel;
pub use mock_channel::{MockChannel, RecordedConsume, RecordedWrite, Settlement};
mod mock_transport;
pub use mock_transport::{MockConnection, MockTransport};
mod recorders;
pub use recorders::{EventRecorder, RecordingHandler};

use broker_channel::{Delivery, DeliveryFields, MessageProperties};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// A delivery as the broker would push it for `body`.
pub fn delivery(delivery_tag: u64, routing_key: &str, body: &[u8]) -> Delivery {
    Delivery {
        fields: DeliveryFields {
            delivery_tag,
            routing_key: routing_key.to_string(),
            ..DeliveryFields::default()
        },
        properties: MessageProperties::default(),
        content: body.to_vec(),
    }
}
