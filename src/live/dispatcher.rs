// SPDX-License-Identifier: GPL-3.0-or-later

use crate::api::provider::{DispatcherBuilder, DispatcherProvider};
use crate::api::{DispatchError, Dispatcher, DispatcherConfig, RequestDescriptor};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Dispatcher sending requests over HTTP to the configured origin.
///
/// Clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpDispatcher {
    inner: Arc<HttpDispatcherInner>,
}

struct HttpDispatcherInner {
    config: DispatcherConfig,
    client: reqwest::Client,
}

impl HttpDispatcher {
    fn new(config: DispatcherConfig) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        header_map.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        let mut builder = reqwest::ClientBuilder::new().default_headers(header_map);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.user_agent() {
            builder = builder.user_agent(user_agent.to_string());
        }
        Ok(Self {
            inner: Arc::new(HttpDispatcherInner {
                config,
                client: builder.build()?,
            }),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(DispatcherConfig::from_env()?)
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError> {
        let request_id = Uuid::new_v4();
        let url = self.inner.config.target(descriptor.route());
        debug!(%request_id, method = %descriptor.method(), %url, "dispatching request");

        let mut request = self.inner.client.request(descriptor.method().into(), &url);
        if let Some(body) = descriptor.body() {
            request = request.body(body.to_string());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%request_id, %url, error = %err, "request failed");
                return Err(transport_error(err));
            }
        };

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|err| {
            warn!(%request_id, %url, error = %err, "failed reading response body");
            transport_error(err)
        })?;

        match serde_json::from_slice(&bytes) {
            Ok(payload) => {
                debug!(%request_id, status, "received response");
                Ok(payload)
            }
            Err(err) => {
                warn!(%request_id, status, error = %err, "response is not valid JSON");
                Err(DispatchError::MalformedResponse {
                    status: Some(status),
                    message: err.to_string(),
                })
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Transport(format!("timed out: {}", err))
    } else {
        DispatchError::Transport(err.to_string())
    }
}

pub struct HttpDispatcherBuilder {
    config: DispatcherConfig,
}

impl HttpDispatcherBuilder {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }
}

impl DispatcherBuilder<HttpDispatcher> for HttpDispatcherBuilder {
    fn build(self) -> Result<HttpDispatcher> {
        HttpDispatcher::new(self.config)
    }
}

pub struct HttpProvider {
    #[doc(hidden)]
    _use_new: (),
}

impl HttpProvider {
    pub fn new() -> Self {
        Self { _use_new: () }
    }
}

impl Default for HttpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherProvider<HttpDispatcher> for HttpProvider {}
