// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink for Azure Event Grid topics using the Event Grid event schema.
//!
//! A batch is posted as a single JSON array with one event per line; the line itself
//! becomes the event's `data`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::debug;
use uuid::Uuid;

use crate::config::{endpoint_url, HttpConfig};
use crate::error::{ConfigError, SinkError};
use crate::field::{FieldResolver, LineData};
use crate::http::Transport;
use crate::sink::EventSink;
use crate::timestamp;

pub const DEFAULT_PATH: &str = "/api/events";
pub const API_VERSION: &str = "2018-01-01";

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone)]
pub struct EventGridFields {
    /// Empty generates a random UUID for each event.
    pub id: String,
    pub subject: String,
    pub event_type: String,
    /// `now` or epoch milliseconds.
    pub event_time: String,
    pub data_version: String,
}

impl Default for EventGridFields {
    fn default() -> Self {
        EventGridFields {
            id: String::new(),
            subject: String::new(),
            event_type: String::new(),
            event_time: timestamp::NOW.to_string(),
            data_version: "1.0".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Event<'a> {
    id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    subject: String,
    data: &'a RawValue,
    #[serde(skip_serializing_if = "String::is_empty")]
    event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_time: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    data_version: String,
}

pub struct EventGridSink {
    transport: Transport,
    fields: FieldResolver,
}

impl EventGridSink {
    pub fn new(http: &HttpConfig, fields: EventGridFields) -> Result<Self, ConfigError> {
        let url = topic_url(&http.endpoint)?;
        debug!("Event Grid events will be posted to {url}");
        Ok(EventGridSink {
            transport: Transport::new(http, url, CONTENT_TYPE),
            fields: FieldResolver::new([
                ("id", fields.id),
                ("subject", fields.subject),
                ("eventType", fields.event_type),
                ("eventTime", fields.event_time),
                ("dataVersion", fields.data_version),
            ]),
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        self.transport.url()
    }

    fn build_event<'a>(&self, raw: &'a str) -> Result<Event<'a>, SinkError> {
        let line = LineData::new(raw);
        let fields = &self.fields;

        let mut id = fields.value("id", &line)?;
        if id.is_empty() {
            id = Uuid::new_v4().to_string();
        }
        Ok(Event {
            id,
            subject: fields.value("subject", &line)?,
            data_version: fields.value("dataVersion", &line)?,
            event_time: self.event_time(&line)?,
            event_type: fields.value("eventType", &line)?,
            // borrows the line as-is for the payload; queries use `line`'s own parse
            data: serde_json::from_str(raw)?,
        })
    }

    fn event_time(&self, line: &LineData<'_>) -> Result<Option<String>, SinkError> {
        let value = self.fields.value("eventTime", line)?;
        if value.is_empty() {
            return Ok(None);
        }
        let time = timestamp::parse_event_time(&value)?;
        Ok(Some(timestamp::rfc3339(&time)))
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<u8>, SinkError> {
        let events = batch
            .iter()
            .map(|raw| self.build_event(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::to_vec(&events)?)
    }
}

#[async_trait]
impl EventSink for EventGridSink {
    async fn flush_events(&self, batch: &[String]) -> Result<(), SinkError> {
        let body = self.encode(batch)?;
        self.transport.post(body).await?;
        Ok(())
    }
}

/// Adds a scheme when missing, defaults the path to `/api/events` and pins the API
/// version unless one is given.
pub fn topic_url(endpoint: &str) -> Result<reqwest::Url, ConfigError> {
    let mut url = endpoint_url(endpoint)?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_PATH);
    }
    if !url.query_pairs().any(|(key, _)| key == "api-version") {
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sink(fields: EventGridFields) -> EventGridSink {
        EventGridSink::new(&HttpConfig::new("http://127.0.0.1:1"), fields).unwrap()
    }

    #[test]
    fn test_topic_url() {
        for (input, want) in [
            (
                "dummy.westus2-1.eventgrid.azure.net",
                "https://dummy.westus2-1.eventgrid.azure.net/api/events?api-version=2018-01-01",
            ),
            (
                "https://dummy.westus2-1.eventgrid.azure.net",
                "https://dummy.westus2-1.eventgrid.azure.net/api/events?api-version=2018-01-01",
            ),
            (
                "https://dummy.westus2-1.eventgrid.azure.net/foo/bar",
                "https://dummy.westus2-1.eventgrid.azure.net/foo/bar?api-version=2018-01-01",
            ),
            (
                "http://127.0.0.1:1234",
                "http://127.0.0.1:1234/api/events?api-version=2018-01-01",
            ),
            (
                "http://127.0.0.1:1234/api/events?api-version=2020-01-01",
                "http://127.0.0.1:1234/api/events?api-version=2020-01-01",
            ),
        ] {
            assert_eq!(topic_url(input).unwrap().as_str(), want, "{input}");
        }
    }

    #[test]
    fn test_build_event() {
        let sink = sink(EventGridFields {
            id: "jp:id".into(),
            subject: "my subject".into(),
            event_type: "jp:type".into(),
            event_time: "jp:time".into(),
            data_version: "1.0".into(),
        });
        let raw = r#"{"id": "qux", "time": 1608309835000, "type": "qux"}"#;
        let event = serde_json::to_value(sink.build_event(raw).unwrap()).unwrap();
        assert_eq!(
            event,
            json!({
                "id": "qux",
                "eventTime": "2020-12-18T16:43:55Z",
                "dataVersion": "1.0",
                "subject": "my subject",
                "eventType": "qux",
                "data": {"id": "qux", "time": 1608309835000u64, "type": "qux"},
            })
        );
    }

    #[test]
    fn test_missing_id_generates_uuid() {
        let sink = sink(EventGridFields::default());
        let first = sink.build_event("{}").unwrap();
        let second = sink.build_event("{}").unwrap();
        assert!(Uuid::parse_str(&first.id).is_ok());
        assert_ne!(first.id, second.id);
        assert!(first.event_time.is_some());
        assert_eq!(first.data_version, "1.0");
    }

    #[test]
    fn test_encode_is_a_json_array() {
        let sink = sink(EventGridFields {
            id: "x".into(),
            event_time: String::new(),
            ..Default::default()
        });
        let body = sink.encode(&["{}".to_string(), "[1]".to_string()]).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"[{"id":"x","data":{},"dataVersion":"1.0"},{"id":"x","data":[1],"dataVersion":"1.0"}]"#
        );
    }
}
