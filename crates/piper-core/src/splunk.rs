// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink for the Splunk HTTP Event Collector.
//!
//! A batch is posted as newline separated event objects, each wrapping the raw line:
//!
//! ```text
//! {"time":1604953432.032,"source":"app","sourcetype":"obj.add","event":{...}}
//! {"time":1604953732.032,"source":"app","sourcetype":"obj.rem","event":{...}}
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::debug;

use crate::config::{endpoint_url, HttpConfig};
use crate::error::{ConfigError, SinkError};
use crate::field::{FieldResolver, LineData};
use crate::http::Transport;
use crate::sink::EventSink;
use crate::timestamp;

pub const DEFAULT_PATH: &str = "/services/collector/event";

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Field specifications for HEC events. Empty fields are left out of the event.
#[derive(Debug, Clone, Default)]
pub struct SplunkFields {
    pub index: String,
    pub host: String,
    pub source: String,
    pub sourcetype: String,
    /// Epoch milliseconds, sent as fractional seconds.
    pub time: String,
}

#[derive(Debug, Serialize)]
struct Event<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    sourcetype: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    index: String,
    event: &'a RawValue,
}

pub struct SplunkSink {
    transport: Transport,
    fields: FieldResolver,
}

impl SplunkSink {
    pub fn new(http: &HttpConfig, fields: SplunkFields) -> Result<Self, ConfigError> {
        let url = collector_url(&http.endpoint)?;
        debug!("Splunk events will be posted to {url}");
        Ok(SplunkSink {
            transport: Transport::new(http, url, CONTENT_TYPE),
            fields: FieldResolver::new([
                ("index", fields.index),
                ("host", fields.host),
                ("sourcetype", fields.sourcetype),
                ("source", fields.source),
                ("time", fields.time),
            ]),
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        self.transport.url()
    }

    fn build_event<'a>(&self, raw: &'a str) -> Result<Event<'a>, SinkError> {
        let line = LineData::new(raw);
        let fields = &self.fields;
        Ok(Event {
            index: fields.value("index", &line)?,
            host: fields.value("host", &line)?,
            sourcetype: fields.value("sourcetype", &line)?,
            source: fields.value("source", &line)?,
            time: self.event_time(&line)?,
            // borrows the line as-is for the payload; queries use `line`'s own parse
            event: serde_json::from_str(raw)?,
        })
    }

    fn event_time(&self, line: &LineData<'_>) -> Result<Option<f64>, SinkError> {
        let value = self.fields.value("time", line)?;
        if value.is_empty() {
            return Ok(None);
        }
        let time = timestamp::parse_epoch_millis(&value)?;
        Ok(Some(timestamp::epoch_seconds(&time)))
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<u8>, SinkError> {
        let mut body = Vec::new();
        for raw in batch {
            serde_json::to_writer(&mut body, &self.build_event(raw)?)?;
            body.push(b'\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl EventSink for SplunkSink {
    async fn flush_events(&self, batch: &[String]) -> Result<(), SinkError> {
        let body = self.encode(batch)?;
        self.transport.post(body).await?;
        Ok(())
    }
}

/// Adds a scheme when missing and defaults the path to the event collector.
pub fn collector_url(endpoint: &str) -> Result<reqwest::Url, ConfigError> {
    let mut url = endpoint_url(endpoint)?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_PATH);
    }
    Ok(url)
}
