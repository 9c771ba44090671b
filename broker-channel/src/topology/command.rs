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

//! Typed topology RPCs and their construction from positional argument tuples.

use crate::error::Error;
use crate::message::FieldTable;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Channel operations that can appear in a topology specification.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TopologyOperation {
    AssertExchange,
    CheckExchange,
    DeleteExchange,
    BindExchange,
    UnbindExchange,
    AssertQueue,
    CheckQueue,
    DeleteQueue,
    PurgeQueue,
    BindQueue,
    UnbindQueue,
    Prefetch,
}

impl TopologyOperation {
    pub const ALL: [TopologyOperation; 12] = [
        TopologyOperation::AssertExchange,
        TopologyOperation::CheckExchange,
        TopologyOperation::DeleteExchange,
        TopologyOperation::BindExchange,
        TopologyOperation::UnbindExchange,
        TopologyOperation::AssertQueue,
        TopologyOperation::CheckQueue,
        TopologyOperation::DeleteQueue,
        TopologyOperation::PurgeQueue,
        TopologyOperation::BindQueue,
        TopologyOperation::UnbindQueue,
        TopologyOperation::Prefetch,
    ];

    /// Name used in topology specifications.
    pub fn name(self) -> &'static str {
        match self {
            TopologyOperation::AssertExchange => "assertExchange",
            TopologyOperation::CheckExchange => "checkExchange",
            TopologyOperation::DeleteExchange => "deleteExchange",
            TopologyOperation::BindExchange => "bindExchange",
            TopologyOperation::UnbindExchange => "unbindExchange",
            TopologyOperation::AssertQueue => "assertQueue",
            TopologyOperation::CheckQueue => "checkQueue",
            TopologyOperation::DeleteQueue => "deleteQueue",
            TopologyOperation::PurgeQueue => "purgeQueue",
            TopologyOperation::BindQueue => "bindQueue",
            TopologyOperation::UnbindQueue => "unbindQueue",
            TopologyOperation::Prefetch => "prefetch",
        }
    }

    /// `assertExchange` becomes `assert_exchange`.
    pub fn snake_name(self) -> String {
        let mut snake = String::with_capacity(self.name().len() + 2);
        for ch in self.name().chars() {
            if ch.is_ascii_uppercase() {
                snake.push('_');
                snake.push(ch.to_ascii_lowercase());
            } else {
                snake.push(ch);
            }
        }
        snake
    }
}

impl Display for TopologyOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the exact camelCase name or its exact snake_case spelling.
impl FromStr for TopologyOperation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        TopologyOperation::ALL
            .into_iter()
            .find(|operation| operation.name() == name || operation.snake_name() == name)
            .ok_or_else(|| Error::configuration(name, "channel has no such operation"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeOptions {
    pub durable: Option<bool>,
    pub internal: bool,
    pub auto_delete: bool,
    pub alternate_exchange: Option<String>,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueOptions {
    pub exclusive: bool,
    pub durable: Option<bool>,
    pub auto_delete: bool,
    pub message_ttl: Option<u32>,
    pub expires: Option<u32>,
    pub dead_letter_exchange: Option<String>,
    pub dead_letter_routing_key: Option<String>,
    pub max_length: Option<u32>,
    pub max_priority: Option<u8>,
    pub arguments: FieldTable,
}

/// Shared by `deleteExchange` and `deleteQueue`; `if_empty` only applies to queues.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteOptions {
    pub if_unused: bool,
    pub if_empty: bool,
}

/// One resolved topology RPC, ready to be applied on a channel.
#[derive(Clone, Debug, PartialEq)]
pub enum TopologyCommand {
    AssertExchange {
        exchange: String,
        kind: String,
        options: ExchangeOptions,
    },
    CheckExchange {
        exchange: String,
    },
    DeleteExchange {
        exchange: String,
        options: DeleteOptions,
    },
    BindExchange {
        destination: String,
        source: String,
        pattern: String,
        arguments: FieldTable,
    },
    UnbindExchange {
        destination: String,
        source: String,
        pattern: String,
        arguments: FieldTable,
    },
    AssertQueue {
        queue: String,
        options: QueueOptions,
    },
    CheckQueue {
        queue: String,
    },
    DeleteQueue {
        queue: String,
        options: DeleteOptions,
    },
    PurgeQueue {
        queue: String,
    },
    BindQueue {
        queue: String,
        source: String,
        pattern: String,
        arguments: FieldTable,
    },
    UnbindQueue {
        queue: String,
        source: String,
        pattern: String,
        arguments: FieldTable,
    },
    Prefetch {
        count: u16,
        global: bool,
    },
}

impl TopologyCommand {
    pub fn operation(&self) -> TopologyOperation {
        match self {
            TopologyCommand::AssertExchange { .. } => TopologyOperation::AssertExchange,
            TopologyCommand::CheckExchange { .. } => TopologyOperation::CheckExchange,
            TopologyCommand::DeleteExchange { .. } => TopologyOperation::DeleteExchange,
            TopologyCommand::BindExchange { .. } => TopologyOperation::BindExchange,
            TopologyCommand::UnbindExchange { .. } => TopologyOperation::UnbindExchange,
            TopologyCommand::AssertQueue { .. } => TopologyOperation::AssertQueue,
            TopologyCommand::CheckQueue { .. } => TopologyOperation::CheckQueue,
            TopologyCommand::DeleteQueue { .. } => TopologyOperation::DeleteQueue,
            TopologyCommand::PurgeQueue { .. } => TopologyOperation::PurgeQueue,
            TopologyCommand::BindQueue { .. } => TopologyOperation::BindQueue,
            TopologyCommand::UnbindQueue { .. } => TopologyOperation::UnbindQueue,
            TopologyCommand::Prefetch { .. } => TopologyOperation::Prefetch,
        }
    }

    /// Builds a command from the positional arguments of one topology tuple.
    ///
    /// Trailing optional arguments may be omitted or `null`; surplus arguments
    /// are rejected.
    pub fn from_args(operation: TopologyOperation, args: &[Value]) -> Result<Self, Error> {
        let mut reader = ArgReader::new(operation, args);

        let command = match operation {
            TopologyOperation::AssertExchange => TopologyCommand::AssertExchange {
                exchange: reader.required("exchange")?,
                kind: reader.required("type")?,
                options: reader.optional("options")?,
            },
            TopologyOperation::CheckExchange => TopologyCommand::CheckExchange {
                exchange: reader.required("exchange")?,
            },
            TopologyOperation::DeleteExchange => TopologyCommand::DeleteExchange {
                exchange: reader.required("exchange")?,
                options: reader.optional("options")?,
            },
            TopologyOperation::BindExchange => TopologyCommand::BindExchange {
                destination: reader.required("destination")?,
                source: reader.required("source")?,
                pattern: reader.required("pattern")?,
                arguments: reader.optional("arguments")?,
            },
            TopologyOperation::UnbindExchange => TopologyCommand::UnbindExchange {
                destination: reader.required("destination")?,
                source: reader.required("source")?,
                pattern: reader.required("pattern")?,
                arguments: reader.optional("arguments")?,
            },
            TopologyOperation::AssertQueue => TopologyCommand::AssertQueue {
                queue: reader.required("queue")?,
                options: reader.optional("options")?,
            },
            TopologyOperation::CheckQueue => TopologyCommand::CheckQueue {
                queue: reader.required("queue")?,
            },
            TopologyOperation::DeleteQueue => TopologyCommand::DeleteQueue {
                queue: reader.required("queue")?,
                options: reader.optional("options")?,
            },
            TopologyOperation::PurgeQueue => TopologyCommand::PurgeQueue {
                queue: reader.required("queue")?,
            },
            TopologyOperation::BindQueue => TopologyCommand::BindQueue {
                queue: reader.required("queue")?,
                source: reader.required("source")?,
                pattern: reader.required("pattern")?,
                arguments: reader.optional("arguments")?,
            },
            TopologyOperation::UnbindQueue => TopologyCommand::UnbindQueue {
                queue: reader.required("queue")?,
                source: reader.required("source")?,
                pattern: reader.required("pattern")?,
                arguments: reader.optional("arguments")?,
            },
            TopologyOperation::Prefetch => TopologyCommand::Prefetch {
                count: reader.required("count")?,
                global: reader.optional("global")?,
            },
        };

        reader.finish()?;
        Ok(command)
    }
}

struct ArgReader<'a> {
    operation: TopologyOperation,
    args: &'a [Value],
    position: usize,
}

impl<'a> ArgReader<'a> {
    fn new(operation: TopologyOperation, args: &'a [Value]) -> Self {
        Self {
            operation,
            args,
            position: 0,
        }
    }

    fn next(&mut self) -> Option<&'a Value> {
        let value = self.args.get(self.position);
        self.position += 1;
        value
    }

    fn required<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, Error> {
        match self.next() {
            Some(value) if !value.is_null() => self.convert(name, value),
            _ => Err(Error::configuration(
                self.operation.name(),
                format!("missing argument `{name}`"),
            )),
        }
    }

    fn optional<T: DeserializeOwned + Default>(&mut self, name: &str) -> Result<T, Error> {
        match self.next() {
            Some(value) if !value.is_null() => self.convert(name, value),
            _ => Ok(T::default()),
        }
    }

    fn convert<T: DeserializeOwned>(&self, name: &str, value: &Value) -> Result<T, Error> {
        serde_json::from_value(value.clone()).map_err(|err| {
            Error::configuration(
                self.operation.name(),
                format!("argument `{name}` is invalid: {err}"),
            )
        })
    }

    fn finish(self) -> Result<(), Error> {
        if self.args.len() > self.position {
            return Err(Error::configuration(
                self.operation.name(),
                format!(
                    "expected at most {} arguments, got {}",
                    self.position,
                    self.args.len()
                ),
            ));
        }
        Ok(())
    }
}
