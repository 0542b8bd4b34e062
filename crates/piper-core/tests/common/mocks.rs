// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock sinks for exercising the publisher without a network

use piper_core::error::SinkError;
use piper_core::sink::EventSink;
use std::sync::Mutex;

/// Mock sink that records every batch it receives
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl EventSink for RecordingSink {
    async fn flush_events(&self, batch: &[String]) -> Result<(), SinkError> {
        self.batches
            .lock()
            .expect("lock poisoned")
            .push(batch.to_vec());
        Ok(())
    }
}
