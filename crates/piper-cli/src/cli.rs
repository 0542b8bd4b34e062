// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use piper_core::{
    config::{HttpConfig, PublisherConfig, DEFAULT_BATCH_SIZE},
    error::ConfigError,
    event_grid::{EventGridFields, EventGridSink},
    eventbridge::{self, EventBridgeFields, EventBridgeSink},
    sink::EventSink,
    splunk::{SplunkFields, SplunkSink},
    timestamp,
};

/// Reads JSON lines from stdin and publishes them in batches.
///
/// Field flags take a literal value, or a JMESPath query evaluated against each line
/// when prefixed with `jp:` (for example `--sourcetype 'jp:type'`).
#[derive(Parser, Debug)]
#[command(name = "piper", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Maximum number of events per request.
    #[arg(long, global = true, env = "PIPER_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Milliseconds between time based flushes, 0 disables them.
    #[arg(long, global = true, env = "PIPER_FLUSH_INTERVAL", default_value_t = 2000)]
    pub flush_interval: u64,

    /// Extra request header as "Name: value". Can be repeated.
    #[arg(short = 'H', long = "header", global = true, env = "PIPER_HEADER")]
    pub headers: Vec<String>,

    /// Request timeout in seconds.
    #[arg(
        long,
        global = true,
        env = "PIPER_TIMEOUT",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish to a Splunk HTTP Event Collector.
    Splunk(SplunkArgs),
    /// Publish to an Azure Event Grid topic.
    EventGrid(EventGridArgs),
    /// Publish to AWS EventBridge.
    #[command(name = "eventbridge")]
    EventBridge(EventBridgeArgs),
}

#[derive(Args, Debug)]
pub struct SplunkArgs {
    /// HEC endpoint; the path defaults to /services/collector/event.
    #[arg(long, env = "PIPER_SPLUNK_ENDPOINT")]
    pub endpoint: String,
    #[arg(long, default_value = "")]
    pub index: String,
    #[arg(long, default_value = "")]
    pub host: String,
    #[arg(long, default_value = "")]
    pub source: String,
    #[arg(long, default_value = "")]
    pub sourcetype: String,
    /// Event time in epoch milliseconds.
    #[arg(long, default_value = "")]
    pub time: String,
}

#[derive(Args, Debug)]
pub struct EventGridArgs {
    /// Topic endpoint; the path defaults to /api/events.
    #[arg(long, env = "PIPER_EVENT_GRID_ENDPOINT")]
    pub endpoint: String,
    /// Event id; a random UUID when empty.
    #[arg(long, default_value = "")]
    pub id: String,
    #[arg(long, default_value = "")]
    pub subject: String,
    #[arg(long, default_value = "")]
    pub event_type: String,
    /// "now" or epoch milliseconds.
    #[arg(long, default_value = timestamp::NOW)]
    pub event_time: String,
    #[arg(long, default_value = "1.0")]
    pub data_version: String,
}

#[derive(Args, Debug)]
pub struct EventBridgeArgs {
    #[arg(long, env = "AWS_REGION", default_value = eventbridge::DEFAULT_REGION)]
    pub region: String,
    /// Overrides the regional endpoint, e.g. for a signing proxy.
    #[arg(long, env = "PIPER_EVENTBRIDGE_ENDPOINT")]
    pub endpoint: Option<String>,
    #[arg(long, default_value = "")]
    pub detail_type: String,
    #[arg(long, default_value = "")]
    pub source: String,
    /// Empty, "now" or epoch milliseconds.
    #[arg(long, default_value = "")]
    pub time: String,
    /// Event bus name, taken literally.
    #[arg(long, default_value = "")]
    pub event_bus: String,
    /// Resource entry. Can be repeated.
    #[arg(long = "resource")]
    pub resources: Vec<String>,
}

impl Cli {
    pub fn publisher_config(&self) -> Result<PublisherConfig, ConfigError> {
        let config = PublisherConfig::new(self.common.batch_size, self.common.flush_interval)?;
        if let Command::EventBridge(_) = self.command {
            config.check_max_batch_size(eventbridge::MAX_BATCH_SIZE)?;
        }
        Ok(config)
    }

    pub fn sink(&self, proxy_https: Option<String>) -> Result<Arc<dyn EventSink>, ConfigError> {
        let endpoint = match &self.command {
            Command::Splunk(args) => args.endpoint.clone(),
            Command::EventGrid(args) => args.endpoint.clone(),
            Command::EventBridge(args) => args
                .endpoint
                .clone()
                .unwrap_or_else(|| eventbridge::regional_endpoint(&args.region)),
        };
        let http = HttpConfig::new(endpoint)
            .with_headers(self.common.headers.as_slice())?
            .with_timeout(Duration::from_secs(self.common.timeout))
            .with_proxy_https(proxy_https);

        Ok(match &self.command {
            Command::Splunk(args) => Arc::new(SplunkSink::new(
                &http,
                SplunkFields {
                    index: args.index.clone(),
                    host: args.host.clone(),
                    source: args.source.clone(),
                    sourcetype: args.sourcetype.clone(),
                    time: args.time.clone(),
                },
            )?),
            Command::EventGrid(args) => Arc::new(EventGridSink::new(
                &http,
                EventGridFields {
                    id: args.id.clone(),
                    subject: args.subject.clone(),
                    event_type: args.event_type.clone(),
                    event_time: args.event_time.clone(),
                    data_version: args.data_version.clone(),
                },
            )?),
            Command::EventBridge(args) => Arc::new(EventBridgeSink::new(
                &http,
                EventBridgeFields {
                    detail_type: args.detail_type.clone(),
                    source: args.source.clone(),
                    time: args.time.clone(),
                    event_bus: args.event_bus.clone(),
                    resources: args.resources.clone(),
                },
            )?),
        })
    }
}
