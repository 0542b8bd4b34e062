// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod cli;

use std::{env, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use piper_core::publisher::Publisher;

// stdin is read on a blocking thread that cannot be interrupted
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = env::var("PIPER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Unable to start the async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let proxy_https = env::var("PIPER_PROXY_HTTPS")
        .or_else(|_| env::var("HTTPS_PROXY"))
        .ok();

    let config = cli
        .publisher_config()
        .context("invalid publisher configuration")?;
    let sink = cli.sink(proxy_https).context("invalid sink configuration")?;
    let publisher = Publisher::new(config, sink);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, flushing remaining events");
            on_signal.cancel();
        }
    });

    info!(
        "Publishing with batch size {} and flush interval {:?}",
        publisher.config().max_batch_size,
        publisher.config().flush_interval
    );
    publisher
        .run(BufReader::new(tokio::io::stdin()), cancel)
        .await?;
    debug!("Input exhausted, all events published");
    Ok(())
}
