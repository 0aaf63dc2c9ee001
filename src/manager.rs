// Copyright (C) 2025 Agostinho Junior
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cancellation and supersession of in-flight requests.
//!
//! A [RequestManager] is meant to live as long as the view that issues the requests. Requests
//! are keyed by their [RequestDescriptor]: issuing a descriptor that is still in flight aborts the
//! older request, and dropping the manager aborts everything it still tracks, so a late reply
//! never reaches a caller that stopped caring about it.

use crate::api::{DispatchError, Dispatcher, DispatcherExt, RequestDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

type InFlightTable = Arc<Mutex<HashMap<RequestDescriptor, InFlight>>>;

struct InFlight {
    id: u64,
    abort: AbortHandle,
}

pub struct RequestManager<D: Dispatcher + 'static> {
    dispatcher: Arc<D>,
    in_flight: InFlightTable,
    next_id: AtomicU64,
}

impl<D: Dispatcher + 'static> RequestManager<D> {
    pub fn new(dispatcher: D) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    pub fn from_shared(dispatcher: Arc<D>) -> Self {
        Self {
            dispatcher,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }

    /// Spawns the request on the current tokio runtime.
    ///
    /// If an equal descriptor is still in flight, that older request is aborted and its handle
    /// resolves to [DispatchError::Cancelled].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn issue(&self, descriptor: RequestDescriptor) -> RequestHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let dispatcher = Arc::clone(&self.dispatcher);
        let in_flight = Arc::clone(&self.in_flight);
        let key = descriptor.clone();

        // Held until the new entry is inserted so the task cannot clean up before it exists.
        let mut table = lock(&self.in_flight);
        let task = tokio::spawn(async move {
            let result = dispatcher.fetch(&descriptor).await;
            finish(&in_flight, &descriptor, id, result)
        });

        let entry = InFlight {
            id,
            abort: task.abort_handle(),
        };
        if let Some(previous) = table.insert(key, entry) {
            debug!(request = id, superseded = previous.id, "superseding in-flight request");
            previous.abort.abort();
        }

        RequestHandle { task }
    }

    /// Aborts the in-flight request for `descriptor`. Returns whether one was found.
    pub fn cancel(&self, descriptor: &RequestDescriptor) -> bool {
        match lock(&self.in_flight).remove(descriptor) {
            Some(entry) => {
                debug!(request = entry.id, %descriptor, "cancelling request");
                entry.abort.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, entry) in lock(&self.in_flight).drain() {
            entry.abort.abort();
        }
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

impl<D: Dispatcher + 'static> Drop for RequestManager<D> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock(table: &InFlightTable) -> MutexGuard<'_, HashMap<RequestDescriptor, InFlight>> {
    table.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Drops the request's table entry and hands back its result, unless the entry was already
/// superseded or cancelled while the reply was on its way. The abort cannot stop a task that has
/// finished fetching, so the stale reply is turned into [DispatchError::Cancelled] here.
fn finish(
    table: &InFlightTable,
    descriptor: &RequestDescriptor,
    id: u64,
    result: Result<Value, DispatchError>,
) -> Result<Value, DispatchError> {
    let mut table = lock(table);
    if table.get(descriptor).is_some_and(|entry| entry.id == id) {
        table.remove(descriptor);
        result
    } else {
        Err(DispatchError::Cancelled)
    }
}

/// Resolves to the outcome of a request issued through a [RequestManager].
pub struct RequestHandle {
    task: JoinHandle<Result<Value, DispatchError>>,
}

impl RequestHandle {
    pub async fn result(self) -> Result<Value, DispatchError> {
        self.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for RequestHandle {
    type Output = Result<Value, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.task).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(err) if err.is_cancelled() => Poll::Ready(Err(DispatchError::Cancelled)),
            Err(err) => Poll::Ready(Err(DispatchError::Transport(format!(
                "request task failed: {}",
                err
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::simulated::{SimulatedBackend, SimulatedBackendBuilder};
    use anyhow::Result;
    use serde_json::json;
    use std::time::Duration;

    fn slow_backend() -> Arc<SimulatedBackend> {
        Arc::new(
            SimulatedBackendBuilder::new()
                .respond(Method::Get, "/collection/get", json!([{"id": 1}]))
                .delay(Method::Get, "/collection/get", Duration::from_secs(2))
                .respond(Method::Get, "/campaigns", json!([]))
                .delay(Method::Get, "/campaigns", Duration::from_secs(2))
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn issue_resolves_and_forgets_request() -> Result<()> {
        let manager = RequestManager::from_shared(slow_backend());
        let handle = manager.issue(RequestDescriptor::get("/collection/get")?);

        assert_eq!(manager.in_flight(), 1);
        assert_eq!(handle.await?, json!([{"id": 1}]));
        assert_eq!(manager.in_flight(), 0);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn issue_supersedes_equal_descriptor() -> Result<()> {
        let manager = RequestManager::from_shared(slow_backend());
        let descriptor = RequestDescriptor::get("/collection/get")?;

        let first = manager.issue(descriptor.clone());
        let second = manager.issue(descriptor);

        assert_eq!(manager.in_flight(), 1);
        assert_eq!(first.await, Err(DispatchError::Cancelled));
        assert_eq!(second.await?, json!([{"id": 1}]));
        assert_eq!(manager.in_flight(), 0);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn different_descriptors_run_independently() -> Result<()> {
        let manager = RequestManager::from_shared(slow_backend());

        let collection = manager.issue(RequestDescriptor::get("/collection/get")?);
        let campaigns = manager.issue(RequestDescriptor::get("/campaigns")?);

        assert_eq!(manager.in_flight(), 2);
        assert_eq!(collection.await?, json!([{"id": 1}]));
        assert_eq!(campaigns.await?, json!([]));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_in_flight_request() -> Result<()> {
        let manager = RequestManager::from_shared(slow_backend());
        let descriptor = RequestDescriptor::get("/collection/get")?;

        let handle = manager.issue(descriptor.clone());

        assert!(manager.cancel(&descriptor));
        assert!(!manager.cancel(&descriptor));
        assert_eq!(handle.result().await, Err(DispatchError::Cancelled));
        assert_eq!(manager.in_flight(), 0);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_manager_cancels_everything() -> Result<()> {
        let manager = RequestManager::from_shared(slow_backend());

        let collection = manager.issue(RequestDescriptor::get("/collection/get")?);
        let campaigns = manager.issue(RequestDescriptor::get("/campaigns")?);
        drop(manager);

        assert_eq!(collection.await, Err(DispatchError::Cancelled));
        assert_eq!(campaigns.await, Err(DispatchError::Cancelled));

        Ok(())
    }

    #[tokio::test]
    async fn application_errors_pass_through() -> Result<()> {
        let manager = RequestManager::new(SimulatedBackendBuilder::new().build());

        let result = manager.issue(RequestDescriptor::get("/profile")?).await;

        assert!(matches!(result, Err(DispatchError::Application(_))));

        Ok(())
    }

    #[tokio::test]
    async fn reply_for_superseded_entry_is_cancelled() -> Result<()> {
        let table: InFlightTable = Arc::new(Mutex::new(HashMap::new()));
        let descriptor = RequestDescriptor::get("/collection/get")?;
        let newer = InFlight {
            id: 2,
            abort: tokio::spawn(async {}).abort_handle(),
        };
        lock(&table).insert(descriptor.clone(), newer);

        let stale = finish(&table, &descriptor, 1, Ok(json!([{"id": 1}])));

        assert_eq!(stale, Err(DispatchError::Cancelled));
        assert_eq!(lock(&table).get(&descriptor).map(|entry| entry.id), Some(2));

        let current = finish(&table, &descriptor, 2, Ok(json!([])));

        assert_eq!(current, Ok(json!([])));
        assert!(lock(&table).is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn reply_after_cancel_is_cancelled() -> Result<()> {
        let table: InFlightTable = Arc::new(Mutex::new(HashMap::new()));
        let descriptor = RequestDescriptor::get("/campaigns")?;

        let result = finish(&table, &descriptor, 0, Ok(json!([])));

        assert_eq!(result, Err(DispatchError::Cancelled));

        Ok(())
    }
}
