// SPDX-License-Identifier: GPL-3.0-or-later

use serde_json::{Value, json};
use std::fmt::{Display, Formatter};

/// The member that marks a reply as an application error when it holds a truthy value.
pub const ERROR_FIELD: &str = "error";

/// Every way a dispatch can fail. All of them travel through the same `Err` channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The server answered with an `error` member; holds that member's value verbatim.
    Application(Value),
    /// The request never completed (connection refused, DNS, timeout).
    Transport(String),
    /// The reply body was not JSON, or not the JSON shape the caller asked for. The status is
    /// known only when the failure happened while reading the HTTP reply.
    MalformedResponse { status: Option<u16>, message: String },
    /// Aborted by a [crate::manager::RequestManager].
    Cancelled,
}

impl DispatchError {
    /// Renders the failure as a JSON error value. Application errors are returned as the server
    /// sent them, the other kinds as `{"kind": ..., "msg": ...}`.
    pub fn to_payload(&self) -> Value {
        match self {
            DispatchError::Application(error) => error.clone(),
            DispatchError::Transport(message) => json!({"kind": "transport", "msg": message}),
            DispatchError::MalformedResponse { status, message } => {
                json!({"kind": "malformed_response", "status": status, "msg": message})
            }
            DispatchError::Cancelled => json!({"kind": "cancelled", "msg": "request cancelled"}),
        }
    }

    pub fn is_application(&self) -> bool {
        matches!(self, DispatchError::Application(_))
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Application(error) => {
                f.write_fmt(format_args!("Server returned an error: {}", error))
            }
            DispatchError::Transport(message) => {
                f.write_fmt(format_args!("Request failed: {}", message))
            }
            DispatchError::MalformedResponse {
                status: Some(status),
                message,
            } => f.write_fmt(format_args!(
                "Malformed response (status {}): {}",
                status, message
            )),
            DispatchError::MalformedResponse {
                status: None,
                message,
            } => f.write_fmt(format_args!("Malformed response: {}", message)),
            DispatchError::Cancelled => f.write_str("Request cancelled"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Splits a parsed reply into the success payload or the application error it carries.
///
/// Only the payload shape decides: an object whose `error` member holds a truthy value is an
/// error whatever the HTTP status was. `null`, `false`, `0` and `""` count as no error, every other
/// value (empty objects and arrays included) is an error description.
pub fn classify(payload: Value) -> Result<Value, DispatchError> {
    match payload {
        Value::Object(mut map) if map.get(ERROR_FIELD).is_some_and(is_truthy) => {
            let error = map.remove(ERROR_FIELD).unwrap_or(Value::Null);
            Err(DispatchError::Application(error))
        }
        payload => Ok(payload),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
