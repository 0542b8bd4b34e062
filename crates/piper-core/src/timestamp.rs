// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversions for timestamp fields, which are configured as epoch milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::SinkError;

/// Field value standing for the time the event is built.
pub const NOW: &str = "now";

pub fn parse_epoch_millis(value: &str) -> Result<DateTime<Utc>, SinkError> {
    let invalid = || SinkError::InvalidTimestamp {
        value: value.to_string(),
    };
    let millis: i64 = value.parse().map_err(|_| invalid())?;
    DateTime::from_timestamp_millis(millis).ok_or_else(invalid)
}

/// Resolves `now` or epoch milliseconds.
pub fn parse_event_time(value: &str) -> Result<DateTime<Utc>, SinkError> {
    if value == NOW {
        return Ok(Utc::now());
    }
    parse_epoch_millis(value)
}

/// Epoch milliseconds as fractional seconds, `1608309835123` becomes `1608309835.123`.
pub fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// RFC 3339 in UTC, with a fraction only when the time has one.
pub fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
