// SPDX-License-Identifier: GPL-3.0-or-later

use crate::api::{DispatchError, Dispatcher, Method, RequestDescriptor};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

type RouteKey = (Method, String);

type Handler = Arc<dyn Fn(Option<Value>) -> Value + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Payload(Value),
    Handler(Handler),
    TransportFailure(String),
}

/// A request as it reached the simulated backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub route: String,
    pub body: Option<String>,
}

/// In-memory marketplace backend answering requests from registered routes.
///
/// Replies are produced on every call, so two identical requests are always served
/// independently. Requests to unregistered routes get an application error reply.
pub struct SimulatedBackend {
    routes: HashMap<RouteKey, Reply>,
    delays: HashMap<RouteKey, Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct SimulatedBackendBuilder {
    routes: HashMap<RouteKey, Reply>,
    delays: HashMap<RouteKey, Duration>,
}

impl SimulatedBackendBuilder {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            delays: HashMap::new(),
        }
    }

    /// Answers `method route` with a fixed payload.
    pub fn respond(&mut self, method: Method, route: &str, payload: Value) -> &mut Self {
        self.set_reply(method, route, Reply::Payload(payload))
    }

    /// Answers `method route` with the value computed from the parsed request body.
    pub fn handle<F>(&mut self, method: Method, route: &str, handler: F) -> &mut Self
    where
        F: Fn(Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.set_reply(method, route, Reply::Handler(Arc::new(handler)))
    }

    /// Makes `method route` fail as if the connection could not be established.
    pub fn fail_transport(&mut self, method: Method, route: &str, message: &str) -> &mut Self {
        self.set_reply(method, route, Reply::TransportFailure(message.into()))
    }

    /// Holds every request to `method route` for `delay` before replying, whether the reply is
    /// registered before or after this call.
    pub fn delay(&mut self, method: Method, route: &str, delay: Duration) -> &mut Self {
        self.delays.insert((method, route.to_string()), delay);
        self
    }

    pub fn build(&self) -> SimulatedBackend {
        SimulatedBackend {
            routes: self.routes.clone(),
            delays: self.delays.clone(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn set_reply(&mut self, method: Method, route: &str, reply: Reply) -> &mut Self {
        self.routes.insert((method, route.to_string()), reply);
        self
    }
}

impl Default for SimulatedBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock_requests().clone()
    }

    pub fn request_count(&self, method: Method, route: &str) -> usize {
        self.lock_requests()
            .iter()
            .filter(|request| request.method == method && request.route == route)
            .count()
    }

    fn lock_requests(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[async_trait]
impl Dispatcher for SimulatedBackend {
    async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError> {
        debug!(method = %descriptor.method(), route = descriptor.route(), "simulated request");
        self.lock_requests().push(RecordedRequest {
            method: descriptor.method(),
            route: descriptor.route().into(),
            body: descriptor.body().map(str::to_string),
        });

        let key = (descriptor.method(), descriptor.route().to_string());
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }

        let Some(reply) = self.routes.get(&key).cloned() else {
            return Ok(json!({"error": {"msg": format!("no handler for {}", descriptor)}}));
        };

        match reply {
            Reply::Payload(payload) => Ok(payload),
            Reply::Handler(handler) => {
                let body = descriptor
                    .body()
                    .and_then(|body| serde_json::from_str(body).ok());
                Ok(handler(body))
            }
            Reply::TransportFailure(message) => Err(DispatchError::Transport(message)),
        }
    }
}
