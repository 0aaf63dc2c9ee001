// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Result, format_err};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use url::Url;

pub const ORIGIN_ENV: &str = "TRADEPOST_ORIGIN";
pub const TIMEOUT_MS_ENV: &str = "TRADEPOST_TIMEOUT_MS";

/// Where and how a dispatcher reaches the marketplace backend.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    origin: Url,
    #[serde(default, rename = "timeout_ms", deserialize_with = "timeout_from_millis")]
    timeout: Option<Duration>,
    #[serde(default)]
    user_agent: Option<String>,
}

impl DispatcherConfig {
    /// Creates a config for an absolute `http`/`https` origin, e.g. `http://localhost:5000`.
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)?;
        check_origin(&origin)?;
        Ok(Self {
            origin,
            timeout: None,
            user_agent: None,
        })
    }

    /// Reads the origin from `TRADEPOST_ORIGIN` and an optional request timeout in milliseconds
    /// from `TRADEPOST_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let origin = env::var(ORIGIN_ENV)
            .map_err(|_| format_err!("Environment variable {} is not set", ORIGIN_ENV))?;
        let config = Self::new(&origin)?;
        match env::var(TIMEOUT_MS_ENV) {
            Ok(millis) => {
                let millis: u64 = millis.trim().parse().map_err(|err| {
                    format_err!("Invalid {} value {}: {}", TIMEOUT_MS_ENV, millis, err)
                })?;
                Ok(config.with_timeout(Duration::from_millis(millis)))
            }
            Err(_) => Ok(config),
        }
    }

    /// Parses a JSON config document, as embedded in a host application's settings.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DispatcherConfig = serde_json::from_str(json)?;
        check_origin(&config.origin)?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Concatenates the origin with a route. A trailing `/` on the origin is dropped so routes,
    /// which always start with `/`, never produce a double slash.
    pub fn target(&self, route: &str) -> String {
        format!("{}{}", self.origin.as_str().trim_end_matches('/'), route)
    }
}

fn check_origin(origin: &Url) -> Result<()> {
    if !matches!(origin.scheme(), "http" | "https") {
        return Err(format_err!("Unsupported origin scheme {}", origin.scheme()));
    }
    if origin.query().is_some() || origin.fragment().is_some() {
        return Err(format_err!(
            "Origin {} must not carry a query or fragment",
            origin
        ));
    }
    Ok(())
}

fn timeout_from_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis: Option<u64> = Option::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
}
