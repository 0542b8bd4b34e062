// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::error::SinkError;

/// Destination for batches of raw lines.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Builds an event for every line in `batch` and delivers them together.
    ///
    /// The batch is all or nothing: an error means none of it should be considered
    /// delivered.
    async fn flush_events(&self, batch: &[String]) -> Result<(), SinkError>;
}
