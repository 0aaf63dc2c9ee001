// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Result, format_err};
use serde::Serialize;
use serde::de::IgnoredAny;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(format_err!("Unsupported http method {}", s)),
        }
    }
}

/// Describes a single request: the method, a route relative to the dispatcher's origin and an
/// optional JSON-encoded body.
///
/// The route always starts with `/` and the body, when present, is valid JSON text. The body is
/// kept exactly as given so it reaches the server byte for byte.
#[derive(Hash, PartialEq, Eq, Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    route: String,
    body: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, route: &str) -> Result<Self> {
        if !route.starts_with('/') {
            return Err(format_err!("Route {} must start with '/'", route));
        }
        Ok(Self {
            method,
            route: route.into(),
            body: None,
        })
    }

    pub fn get(route: &str) -> Result<Self> {
        Self::new(Method::Get, route)
    }

    pub fn delete(route: &str) -> Result<Self> {
        Self::new(Method::Delete, route)
    }

    pub fn post(route: &str, body: &str) -> Result<Self> {
        Self::new(Method::Post, route)?.with_body(body)
    }

    pub fn post_json<T: Serialize>(route: &str, body: &T) -> Result<Self> {
        Self::new(Method::Post, route)?.with_json(body)
    }

    /// Attaches an already encoded JSON body, rejecting text that does not parse as JSON.
    pub fn with_body(mut self, body: &str) -> Result<Self> {
        serde_json::from_str::<IgnoredAny>(body)
            .map_err(|err| format_err!("Body for {} is not valid JSON: {}", self.route, err))?;
        self.body = Some(body.into());
        Ok(self)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl Display for RequestDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{} {}", self.method, self.route))
    }
}
