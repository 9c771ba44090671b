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

//! Error types shared by the transport seam and the channel lifecycle.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

/// Error reported by the broker or the transport adapter.
///
/// `code` carries the broker reply code when one exists (for example `404` when
/// `checkQueue` names a missing queue, `406` on a precondition failure).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrokerError {
    pub code: Option<u16>,
    pub message: String,
}

impl BrokerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl StdError for BrokerError {}

/// Failures surfaced by channel setup and by simplified channel operations.
///
/// Setup-time variants (`Connection`, `Configuration`, `Assertion`,
/// `InvalidUrl`, `InvalidConfig`) abort the whole setup. Runtime variants
/// (`Write`, `Rpc`, `Encode`, `Decode`, `ChannelClosed`) only affect the
/// operation that produced them.
#[derive(Debug)]
pub enum Error {
    Connection(BrokerError),
    Configuration { operation: String, reason: String },
    /// A topology RPC was rejected; holds the broker's error as reported.
    Assertion(BrokerError),
    Write(BrokerError),
    /// Any other channel RPC (`get`, `consume`, `ack`, ...) was rejected.
    Rpc(BrokerError),
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    InvalidUrl(String),
    InvalidConfig(String),
    ChannelClosed,
}

impl Error {
    pub(crate) fn configuration(operation: &str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the broker-reported error behind this failure, if any.
    pub fn broker_error(&self) -> Option<&BrokerError> {
        match self {
            Error::Connection(err)
            | Error::Assertion(err)
            | Error::Write(err)
            | Error::Rpc(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Connection(err) => write!(f, "unable to connect to broker: {err}"),
            Error::Configuration { operation, reason } => {
                write!(f, "invalid topology operation `{operation}`: {reason}")
            }
            Error::Assertion(err) => write!(f, "topology assertion failed: {err}"),
            Error::Write(err) => write!(f, "broker rejected write: {err}"),
            Error::Rpc(err) => write!(f, "channel operation failed: {err}"),
            Error::Encode(err) => write!(f, "unable to encode payload: {err}"),
            Error::Decode(err) => write!(f, "unable to decode payload: {err}"),
            Error::InvalidUrl(reason) => write!(f, "invalid broker url: {reason}"),
            Error::InvalidConfig(reason) => write!(f, "invalid channel config: {reason}"),
            Error::ChannelClosed => write!(f, "channel closed before the broker answered"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Connection(err)
            | Error::Assertion(err)
            | Error::Write(err)
            | Error::Rpc(err) => Some(err),
            Error::Encode(err) | Error::Decode(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BrokerError, Error};
    use std::error::Error as StdError;

    #[test]
    fn broker_error_display_includes_reply_code() {
        let error = BrokerError::with_code(404, "NOT_FOUND - no queue 'jobs'");

        assert_eq!(error.to_string(), "NOT_FOUND - no queue 'jobs' (404)");
        assert_eq!(BrokerError::new("boom").to_string(), "boom");
    }

    #[test]
    fn assertion_error_exposes_original_broker_error() {
        let original = BrokerError::with_code(406, "PRECONDITION_FAILED");
        let error = Error::Assertion(original.clone());

        assert_eq!(error.broker_error(), Some(&original));
        assert!(error.source().is_some());
    }

    #[test]
    fn configuration_error_names_the_operation() {
        let error = Error::configuration("assertExchnage", "unknown operation");

        assert!(error.to_string().contains("assertExchnage"));
        assert!(error.source().is_none());
        assert!(error.broker_error().is_none());
    }
}
