// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Pipes newline-delimited JSON to event ingestion endpoints.
//!
//! A [`publisher::Publisher`] batches input lines and hands each batch to an
//! [`sink::EventSink`]. The bundled sinks build one event per line, filling metadata
//! fields from literals or `jp:` JMESPath queries (see [`field`]).

pub mod config;
pub mod error;
pub mod event_grid;
pub mod eventbridge;
pub mod field;
pub mod http;
pub mod publisher;
pub mod sink;
pub mod splunk;
pub mod timestamp;
