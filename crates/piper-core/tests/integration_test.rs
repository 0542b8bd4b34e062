// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::helpers::publish;
use mockito::{Matcher, Server};
use piper_core::{
    config::HttpConfig,
    error::{PublisherError, SinkError},
    event_grid::{EventGridFields, EventGridSink},
    eventbridge::{EventBridgeFields, EventBridgeSink},
    splunk::{SplunkFields, SplunkSink},
};
use serde_json::json;
use std::sync::Arc;

const SPLUNK_INPUT: &str = r#"
{"id": "foo", "@timestamp": "1608309835123", "type": "foo"}


{"id": "bar", "@timestamp": "1608309835123", "type": "bar"}
{"id": "baz", "@timestamp": "1608309835123", "type": "baz"}
{"id": "qux", "@timestamp": 1608309835123, "type": "qux"}
"#;

fn splunk_event(sourcetype: &str, raw: &str) -> String {
    format!(
        r#"{{"time":1608309835.123,"host":"a host","source":"the source","sourcetype":"{sourcetype}","index":"an index","event":{raw}}}"#
    )
}

fn splunk_sink(endpoint: String) -> SplunkSink {
    let http = HttpConfig::new(endpoint)
        .with_headers(&["foo: bar"])
        .expect("valid headers");
    SplunkSink::new(
        &http,
        SplunkFields {
            index: "an index".to_string(),
            host: "a host".to_string(),
            source: "the source".to_string(),
            sourcetype: "jp:type".to_string(),
            time: r#"jp:"@timestamp""#.to_string(),
        },
    )
    .expect("valid splunk sink")
}

#[tokio::test]
async fn splunk_sink_posts_batches() {
    let mut server = Server::new_async().await;
    let lines: Vec<&str> = SPLUNK_INPUT
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();

    let first_body = format!(
        "{}\n{}\n{}\n",
        splunk_event("foo", lines[0]),
        splunk_event("bar", lines[1]),
        splunk_event("baz", lines[2]),
    );
    let second_body = format!("{}\n", splunk_event("qux", lines[3]));

    let first = server
        .mock("POST", "/services/collector/event")
        .match_header("foo", "bar")
        .match_header("content-type", "application/json; charset=utf-8")
        .match_body(Matcher::Exact(first_body))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/services/collector/event")
        .match_body(Matcher::Exact(second_body))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    publish(Arc::new(splunk_sink(server.url())), 3, SPLUNK_INPUT)
        .await
        .expect("publish should succeed");

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn splunk_sink_rejection_ends_run() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/services/collector/event")
        .with_status(403)
        .with_body(r#"{"text":"Invalid token","code":4}"#)
        .expect(1)
        .create_async()
        .await;

    let err = publish(Arc::new(splunk_sink(server.url())), 3, SPLUNK_INPUT)
        .await
        .expect_err("publish should fail");

    match err {
        PublisherError::Sink {
            lines: 3,
            source: SinkError::Status { status, body },
        } => {
            assert_eq!(status.as_u16(), 403);
            assert!(body.contains("Invalid token"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // the second batch is never attempted
    mock.assert_async().await;
}

#[tokio::test]
async fn event_grid_sink_posts_json_arrays() {
    let mut server = Server::new_async().await;
    let input = r#"
{"id": "foo", "time": "1608309835000", "type": "foo"}
{"id": "bar", "time": "1608309835000", "type": "bar"}
{"id": "baz", "time": "1608309835000", "type": "baz"}
{"id": "qux", "time": 1608309835000, "type": "qux"}
"#;
    let event = |id: &str, data: serde_json::Value| {
        json!({
            "id": id,
            "eventTime": "2020-12-18T16:43:55Z",
            "dataVersion": "1.0",
            "subject": "my subject",
            "eventType": id,
            "data": data,
        })
    };

    let first = server
        .mock("POST", Matcher::Regex("^/api/events".to_string()))
        .match_query(Matcher::UrlEncoded(
            "api-version".to_string(),
            "2018-01-01".to_string(),
        ))
        .match_header("aeg-sas-key", "shhh")
        .match_body(Matcher::Json(json!([
            event("foo", json!({"id": "foo", "time": "1608309835000", "type": "foo"})),
            event("bar", json!({"id": "bar", "time": "1608309835000", "type": "bar"})),
            event("baz", json!({"id": "baz", "time": "1608309835000", "type": "baz"})),
        ])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", Matcher::Regex("^/api/events".to_string()))
        .match_body(Matcher::Json(json!([event(
            "qux",
            json!({"id": "qux", "time": 1608309835000u64, "type": "qux"})
        )])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let http = HttpConfig::new(server.url())
        .with_headers(&["aeg-sas-key: shhh"])
        .expect("valid headers");
    let sink = EventGridSink::new(
        &http,
        EventGridFields {
            id: "jp:id".to_string(),
            subject: "my subject".to_string(),
            event_type: "jp:type".to_string(),
            event_time: "jp:time".to_string(),
            data_version: "1.0".to_string(),
        },
    )
    .expect("valid event grid sink");

    publish(Arc::new(sink), 3, input)
        .await
        .expect("publish should succeed");

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn event_grid_bad_query_fails_first_flush() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let sink = EventGridSink::new(
        &HttpConfig::new(server.url()),
        EventGridFields {
            subject: "jp:foo[".to_string(),
            ..Default::default()
        },
    )
    .expect("queries compile lazily");

    let err = publish(Arc::new(sink), 10, "{}\n")
        .await
        .expect_err("publish should fail");
    assert!(matches!(
        err,
        PublisherError::Sink {
            source: SinkError::Field(_),
            ..
        }
    ));
    mock.assert_async().await;
}

fn eventbridge_sink(endpoint: String) -> EventBridgeSink {
    EventBridgeSink::new(
        &HttpConfig::new(endpoint),
        EventBridgeFields {
            detail_type: "jp:type".to_string(),
            source: "the-cloud".to_string(),
            time: "1608309835000".to_string(),
            event_bus: "a-bus".to_string(),
            resources: vec!["a resource".to_string(), "jp:type".to_string()],
        },
    )
    .expect("valid eventbridge sink")
}

fn eventbridge_entry(raw: &str, detail_type: &str) -> serde_json::Value {
    json!({
        "Detail": raw,
        "DetailType": detail_type,
        "EventBusName": "a-bus",
        "Resources": ["a resource", detail_type],
        "Source": "the-cloud",
        "Time": 1608309835.0,
    })
}

#[tokio::test]
async fn eventbridge_sink_puts_events() {
    let mut server = Server::new_async().await;
    let lines = [
        r#"{"id": "foo", "time": "1608309835000", "type": "foo"}"#,
        r#"{"id": "bar", "time": "1608309835000", "type": "bar"}"#,
    ];

    let mock = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSEvents.PutEvents")
        .match_header("content-type", "application/x-amz-json-1.1")
        .match_body(Matcher::Json(json!({
            "Entries": [
                eventbridge_entry(lines[0], "foo"),
                eventbridge_entry(lines[1], "bar"),
            ]
        })))
        .with_status(200)
        .with_body(r#"{"FailedEntryCount":0,"Entries":[{"EventId":"1"},{"EventId":"2"}]}"#)
        .expect(1)
        .create_async()
        .await;

    publish(Arc::new(eventbridge_sink(server.url())), 10, &lines.join("\n"))
        .await
        .expect("publish should succeed");

    mock.assert_async().await;
}

#[tokio::test]
async fn eventbridge_failed_entries_fail_the_batch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"FailedEntryCount":1,"Entries":[{"ErrorCode":"InternalFailure"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let err = publish(Arc::new(eventbridge_sink(server.url())), 10, "{\"type\":\"x\"}\n")
        .await
        .expect_err("publish should fail");

    match err {
        PublisherError::Sink {
            source: SinkError::Rejected { failed, total, .. },
            ..
        } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}
