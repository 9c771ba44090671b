/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

//! Canonical structured field values and value-format helpers.

pub const NONE: &str = "none";
pub const REASON_SHUTTING_DOWN: &str = "shutting_down";
pub const REASON_ALREADY_RECONNECTING: &str = "already_reconnecting";
pub const REASON_STALE_CONNECTION: &str = "stale_connection";

/// Renders an optional routing value, substituting [`NONE`] for empty names.
pub fn name_or_none(name: &str) -> &str {
    if name.is_empty() {
        NONE
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::{name_or_none, NONE};

    #[test]
    fn name_or_none_marks_default_exchange() {
        assert_eq!(name_or_none(""), NONE);
        assert_eq!(name_or_none("events"), "events");
    }
}
