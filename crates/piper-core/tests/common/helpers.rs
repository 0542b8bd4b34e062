// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for driving a publisher over fixed input

use piper_core::config::PublisherConfig;
use piper_core::error::PublisherError;
use piper_core::publisher::Publisher;
use piper_core::sink::EventSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a publisher with no flush interval over `input` until it is exhausted
#[allow(dead_code)]
pub async fn publish(
    sink: Arc<dyn EventSink>,
    max_batch_size: usize,
    input: &str,
) -> Result<(), PublisherError> {
    let config = PublisherConfig::new(max_batch_size, 0).expect("valid publisher config");
    Publisher::new(config, sink)
        .run(input.as_bytes(), CancellationToken::new())
        .await
}
