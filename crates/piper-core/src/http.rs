// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP plumbing shared by the sinks.
//!
//! Every sink posts a JSON body to a single endpoint with the user's headers and only
//! accepts `200 OK`. Anything else fails the batch with the status and response body.

use core::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, error};

use crate::config::HttpConfig;
use crate::error::SinkError;

/// Creates a client for `config`, falling back to a direct connection when the proxy
/// can't be used.
#[must_use]
pub fn get_client(config: &HttpConfig) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &HttpConfig, allow_proxy: bool) -> Result<reqwest::Client, reqwest::Error> {
    let mut client = reqwest::Client::builder()
        .timeout(config.timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.proxy_https {
            client = client.proxy(reqwest::Proxy::https(https_uri.clone())?);
        }
    }

    client.build()
}

/// Posts `body` to `url` and fails unless the response is `200 OK`.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: reqwest::Client,
    url: reqwest::Url,
    headers: HeaderMap,
}

impl Transport {
    pub(crate) fn new(config: &HttpConfig, url: reqwest::Url, content_type: &'static str) -> Self {
        let mut headers = config.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Transport {
            client: get_client(config),
            url,
            headers,
        }
    }

    pub(crate) fn url(&self) -> &reqwest::Url {
        &self.url
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub(crate) async fn post(&self, body: Vec<u8>) -> Result<String, SinkError> {
        let size = body.len();
        let resp = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if status != StatusCode::OK {
            return Err(SinkError::Status { status, body: text });
        }
        debug!("Posted {size} bytes to {}", self.url);
        Ok(text)
    }
}
