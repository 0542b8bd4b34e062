// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use reqwest::StatusCode;

/// Errors produced while resolving a field value for a single line.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("invalid query for field {field:?}: {source}")]
    Compile {
        field: String,
        #[source]
        source: jmespath::JmespathError,
    },

    #[error("failed to evaluate query for field {field:?}: {source}")]
    Eval {
        field: String,
        #[source]
        source: jmespath::JmespathError,
    },

    /// The line is shared by every field that queries it, so the parse error is too.
    #[error("line is not valid JSON: {0}")]
    LineParse(#[source] Arc<serde_json::Error>),
}

/// Errors a sink reports for a batch. Any of these fails the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("invalid timestamp {value:?}: expected epoch milliseconds")]
    InvalidTimestamp { value: String },

    #[error("failed to encode events: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Response(#[source] serde_json::Error),

    #[error("not OK, status code: {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("{failed} of {total} entries were rejected: {body}")]
    Rejected {
        failed: u64,
        total: usize,
        body: String,
    },
}

/// Errors that end a publisher run.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("publisher is already running")]
    AlreadyRunning,

    #[error("failed to read input: {0}")]
    InputRead(#[from] std::io::Error),

    #[error("failed to flush {lines} events: {source}")]
    Sink {
        lines: usize,
        #[source]
        source: SinkError,
    },
}

/// Errors raised while turning user settings into a publisher and sink.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("batch size must be at least 1")]
    EmptyBatch,

    #[error("batch size {0} exceeds the maximum of {1}")]
    BatchTooLarge(usize, usize),
}
