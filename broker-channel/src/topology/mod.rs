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

//! Declarative exchange/queue/binding setup applied when a channel opens.

mod asserter;
mod command;
mod spec;

pub use asserter::assert_topology;
pub use command::{
    DeleteOptions, ExchangeOptions, QueueOptions, TopologyCommand, TopologyOperation,
};
pub use spec::TopologySpec;
