// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ConfigError;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Number of lines that triggers a flush.
    pub max_batch_size: usize,
    /// How long a partial batch may wait before it is flushed. Zero never flushes a
    /// partial batch before end of input.
    pub flush_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            max_batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl PublisherConfig {
    pub fn new(max_batch_size: usize, flush_interval_ms: u64) -> Result<Self, ConfigError> {
        if max_batch_size == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        Ok(PublisherConfig {
            max_batch_size,
            flush_interval: Duration::from_millis(flush_interval_ms),
        })
    }

    /// Rejects batch sizes above a sink's own limit.
    pub fn check_max_batch_size(&self, limit: usize) -> Result<(), ConfigError> {
        if self.max_batch_size > limit {
            return Err(ConfigError::BatchTooLarge(self.max_batch_size, limit));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: String,
    pub headers: HeaderMap,
    /// Timeout for each request, including reading the response.
    pub timeout: Duration,
    pub proxy_https: Option<String>,
}

impl HttpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpConfig {
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy_https: None,
        }
    }

    /// Adds curl style `Name: value` headers.
    pub fn with_headers<S: AsRef<str>>(mut self, headers: &[S]) -> Result<Self, ConfigError> {
        self.headers.extend(parse_headers(headers)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy_https(mut self, proxy_https: Option<String>) -> Self {
        self.proxy_https = proxy_https;
        self
    }
}

/// Parses curl style headers. A repeated name keeps the last value.
pub fn parse_headers<S: AsRef<str>>(headers: &[S]) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for header in headers {
        let header = header.as_ref();
        let invalid = || ConfigError::InvalidHeader(header.to_string());
        let (name, value) = header.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Prepends `https://` when the endpoint has no scheme and parses it.
pub(crate) fn endpoint_url(endpoint: &str) -> Result<reqwest::Url, ConfigError> {
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    reqwest::Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
