// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink for AWS EventBridge `PutEvents`.
//!
//! Requests use the AWS JSON 1.1 protocol. They are not signed here: credentials are
//! whatever headers the user configures, typically for a signing proxy in front of the
//! EventBridge endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{endpoint_url, HttpConfig};
use crate::error::{ConfigError, SinkError};
use crate::field::{FieldResolver, LineData};
use crate::http::Transport;
use crate::sink::EventSink;
use crate::timestamp;

/// `PutEvents` accepts at most this many entries per request.
pub const MAX_BATCH_SIZE: usize = 10;
pub const DEFAULT_REGION: &str = "us-east-1";

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET: &str = "AWSEvents.PutEvents";

#[derive(Debug, Clone, Default)]
pub struct EventBridgeFields {
    pub detail_type: String,
    pub source: String,
    /// Empty leaves the time to EventBridge, otherwise `now` or epoch milliseconds.
    pub time: String,
    /// Literal bus name; empty uses the default bus.
    pub event_bus: String,
    /// One field specification per entry of `Resources`.
    pub resources: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Entry<'a> {
    detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_bus_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    /// Epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsRequest<'a> {
    entries: Vec<Entry<'a>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsResponse {
    #[serde(default)]
    failed_entry_count: u64,
}

pub struct EventBridgeSink {
    transport: Transport,
    fields: FieldResolver,
    event_bus: String,
    resources: usize,
}

impl EventBridgeSink {
    pub fn new(http: &HttpConfig, fields: EventBridgeFields) -> Result<Self, ConfigError> {
        let url = endpoint_url(&http.endpoint)?;
        debug!("EventBridge events will be posted to {url}");

        let resources = fields.resources.len();
        let mut specs = vec![
            ("DetailType".to_string(), fields.detail_type),
            ("Source".to_string(), fields.source),
            ("Time".to_string(), fields.time),
        ];
        specs.extend(
            fields
                .resources
                .into_iter()
                .enumerate()
                .map(|(i, spec)| (resource_name(i), spec)),
        );

        Ok(EventBridgeSink {
            transport: Transport::new(http, url, CONTENT_TYPE).with_header("x-amz-target", TARGET),
            fields: FieldResolver::new(specs),
            event_bus: fields.event_bus,
            resources,
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        self.transport.url()
    }

    fn build_entry<'a>(&'a self, raw: &'a str) -> Result<Entry<'a>, SinkError> {
        let line = LineData::new(raw);
        let fields = &self.fields;

        let detail_type = fields.value("DetailType", &line)?;
        let source = fields.value("Source", &line)?;
        let time = self.event_time(&line)?;
        let resources = (0..self.resources)
            .map(|i| fields.value(&resource_name(i), &line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Entry {
            detail: raw,
            detail_type: non_empty(detail_type),
            event_bus_name: (!self.event_bus.is_empty()).then_some(self.event_bus.as_str()),
            resources,
            source: non_empty(source),
            time,
        })
    }

    fn event_time(&self, line: &LineData<'_>) -> Result<Option<f64>, SinkError> {
        let value = self.fields.value("Time", line)?;
        if value.is_empty() {
            return Ok(None);
        }
        let time = timestamp::parse_event_time(&value)?;
        Ok(Some(timestamp::epoch_seconds(&time)))
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<u8>, SinkError> {
        let entries = batch
            .iter()
            .map(|raw| self.build_entry(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::to_vec(&PutEventsRequest { entries })?)
    }
}

#[async_trait]
impl EventSink for EventBridgeSink {
    async fn flush_events(&self, batch: &[String]) -> Result<(), SinkError> {
        let body = self.encode(batch)?;
        let text = self.transport.post(body).await?;
        let resp: PutEventsResponse = serde_json::from_str(&text).map_err(SinkError::Response)?;
        if resp.failed_entry_count != 0 {
            warn!(
                "EventBridge rejected {} of {} entries",
                resp.failed_entry_count,
                batch.len()
            );
            return Err(SinkError::Rejected {
                failed: resp.failed_entry_count,
                total: batch.len(),
                body: text,
            });
        }
        Ok(())
    }
}

/// The public EventBridge endpoint for `region`.
pub fn regional_endpoint(region: &str) -> String {
    format!("https://events.{region}.amazonaws.com/")
}

fn resource_name(i: usize) -> String {
    format!("resource_{i}")
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
