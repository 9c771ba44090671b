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

//! Ordered topology specification as written in configuration files.

use crate::error::Error;
use crate::topology::command::{TopologyCommand, TopologyOperation};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::Formatter;

/// Ordered mapping from operation name to the argument tuples applied with it.
///
/// ```
/// use broker_channel::TopologySpec;
/// use serde_json::json;
///
/// let spec: TopologySpec = json5::from_str(
///     r#"{
///         assertExchange: [["events", "fanout", { durable: true }]],
///         assertQueue: [["audit", { durable: true }]],
///         bindQueue: [["audit", "events", ""]],
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(spec.len(), 3);
/// assert_eq!(spec.entries()[2].0, "bindQueue");
/// assert_eq!(spec.entries()[2].1[0], vec![json!("audit"), json!("events"), json!("")]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologySpec {
    entries: Vec<(String, Vec<Vec<Value>>)>,
}

impl TopologySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one argument tuple under `operation`, keeping first-seen name order.
    pub fn with(mut self, operation: &str, args: Vec<Value>) -> Self {
        self.push(operation, args);
        self
    }

    pub fn push(&mut self, operation: &str, args: Vec<Value>) {
        match self.entries.iter_mut().find(|(name, _)| name == operation) {
            Some((_, tuples)) => tuples.push(args),
            None => self.entries.push((operation.to_string(), vec![args])),
        }
    }

    /// Adds `tuples` under `operation`. The name is kept even when `tuples`
    /// is empty so that resolution still checks it.
    fn extend(&mut self, operation: String, tuples: Vec<Vec<Value>>) {
        match self.entries.iter_mut().find(|(name, _)| *name == operation) {
            Some((_, existing)) => existing.extend(tuples),
            None => self.entries.push((operation, tuples)),
        }
    }

    pub fn entries(&self) -> &[(String, Vec<Vec<Value>>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every entry into typed commands, in specification order.
    ///
    /// `supports` decides whether the target channel exposes an operation. The
    /// first unknown or unsupported name, or the first tuple that does not fit
    /// its operation, fails the whole resolution.
    pub fn resolve<F>(&self, supports: F) -> Result<Vec<TopologyCommand>, Error>
    where
        F: Fn(TopologyOperation) -> bool,
    {
        let mut commands = Vec::new();
        for (name, tuples) in &self.entries {
            let operation: TopologyOperation = name.parse()?;
            if !supports(operation) {
                return Err(Error::configuration(
                    name,
                    "operation is not supported by this channel",
                ));
            }
            for args in tuples {
                commands.push(TopologyCommand::from_args(operation, args)?);
            }
        }
        Ok(commands)
    }
}

impl Serialize for TopologySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, tuples) in &self.entries {
            map.serialize_entry(name, tuples)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopologySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = TopologySpec;

            fn expecting(&self, f: &mut Formatter) -> std::fmt::Result {
                f.write_str("a map of operation names to lists of argument tuples")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(TopologySpec::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut spec = TopologySpec::default();
                while let Some((name, tuples)) = access.next_entry::<String, Vec<Vec<Value>>>()? {
                    spec.extend(name, tuples);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::TopologySpec;
    use crate::error::Error;
    use crate::topology::command::{TopologyCommand, TopologyOperation};
    use serde_json::json;

    #[test]
    fn deserialization_keeps_declaration_order() {
        let spec: TopologySpec = serde_json::from_str(
            r#"{
                "purgeQueue": [["b"]],
                "assertQueue": [["a"], ["c"]],
                "checkExchange": [["x"]]
            }"#,
        )
        .expect("spec should parse");

        let names: Vec<&str> = spec.entries().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["purgeQueue", "assertQueue", "checkExchange"]);
        assert_eq!(spec.entries()[1].1.len(), 2);
    }

    #[test]
    fn operation_without_tuples_is_still_validated() {
        let spec: TopologySpec =
            serde_json::from_str(r#"{ "assertQueue": [], "bogusOperation": [] }"#)
                .expect("spec should parse");

        assert_eq!(spec.len(), 2);
        assert!(spec.entries()[0].1.is_empty());
        let error = spec.resolve(|_| true).expect_err("unknown name should fail");
        assert!(matches!(
            error,
            Error::Configuration { ref operation, .. } if operation == "bogusOperation"
        ));
    }

    #[test]
    fn null_spec_means_no_assertions() {
        let spec: TopologySpec = serde_json::from_str("null").expect("null should parse");

        assert!(spec.is_empty());
    }

    #[test]
    fn resolve_produces_one_command_per_tuple() {
        let spec = TopologySpec::new()
            .with("assertQueue", vec![json!("a")])
            .with("assertQueue", vec![json!("b")])
            .with("prefetch", vec![json!(10)]);

        let commands = spec.resolve(|_| true).expect("spec should resolve");

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1].operation(), TopologyOperation::AssertQueue);
        assert_eq!(
            commands[2],
            TopologyCommand::Prefetch {
                count: 10,
                global: false
            }
        );
    }

    #[test]
    fn resolve_rejects_operations_the_channel_lacks() {
        let spec = TopologySpec::new()
            .with("assertQueue", vec![json!("a")])
            .with("prefetch", vec![json!(10)]);

        let error = spec
            .resolve(|operation| operation != TopologyOperation::Prefetch)
            .expect_err("prefetch is unsupported");

        assert!(matches!(
            error,
            Error::Configuration { ref operation, .. } if operation == "prefetch"
        ));
    }

    #[test]
    fn serialization_round_trips_through_json5() {
        let spec = TopologySpec::new()
            .with("assertExchange", vec![json!("events"), json!("topic")])
            .with("bindQueue", vec![json!("audit"), json!("events"), json!("#")]);

        let text = serde_json::to_string(&spec).expect("spec should serialize");
        let parsed: TopologySpec = json5::from_str(&text).expect("spec should parse back");

        assert_eq!(parsed, spec);
    }
}
