// SPDX-License-Identifier: GPL-3.0-or-later

use crate::api::request::RequestDescriptor;
use crate::api::response::{DispatchError, classify};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// A transport able to carry a [RequestDescriptor] to the marketplace backend.
///
/// Implementations only move bytes: they send the request and parse the reply as JSON. Deciding
/// whether the reply is a success or an application error is shared by every implementation
/// through [DispatcherExt].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends the request and returns the reply body parsed as JSON, whatever it contains.
    async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError>;
}

#[async_trait]
impl<T: Dispatcher + ?Sized> Dispatcher for Arc<T> {
    async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError> {
        self.as_ref().round_trip(descriptor).await
    }
}

#[async_trait]
impl<T: Dispatcher + ?Sized> Dispatcher for Box<T> {
    async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError> {
        self.as_ref().round_trip(descriptor).await
    }
}

/// Dispatch operations available on every [Dispatcher].
pub trait DispatcherExt: Dispatcher {
    /// Performs the request and returns the success payload, or the `error` member of the reply
    /// as [DispatchError::Application].
    fn fetch(
        &self,
        descriptor: &RequestDescriptor,
    ) -> impl Future<Output = Result<Value, DispatchError>> + Send {
        async move { classify(self.round_trip(descriptor).await?) }
    }

    /// Same as [DispatcherExt::fetch], deserializing the success payload into `T`.
    fn fetch_as<T>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> impl Future<Output = Result<T, DispatchError>> + Send
    where
        T: DeserializeOwned,
    {
        async move {
            let payload = self.fetch(descriptor).await?;
            serde_json::from_value(payload).map_err(|err| DispatchError::MalformedResponse {
                status: None,
                message: err.to_string(),
            })
        }
    }

    /// Performs the request and hands the success payload to `on_success` together with `extra`,
    /// returning whatever the continuation returns.
    ///
    /// On an application error, a transport failure or a malformed reply the continuation is not
    /// called and the error is returned instead.
    fn dispatch<F, A, R>(
        &self,
        on_success: F,
        descriptor: &RequestDescriptor,
        extra: A,
    ) -> impl Future<Output = Result<R, DispatchError>> + Send
    where
        F: FnOnce(Value, A) -> R + Send,
        A: Send,
        R: Send,
    {
        async move {
            let payload = self.fetch(descriptor).await?;
            Ok(on_success(payload, extra))
        }
    }
}

impl<T: Dispatcher + ?Sized> DispatcherExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedReply {
        reply: Value,
        calls: AtomicUsize,
    }

    impl FixedReply {
        fn new(reply: Value) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Dispatcher for FixedReply {
        async fn round_trip(&self, _: &RequestDescriptor) -> Result<Value, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn dispatch_invokes_continuation_once_on_success() -> Result<()> {
        let dispatcher = FixedReply::new(json!({"value": 42}));
        let descriptor = RequestDescriptor::get("/x")?;
        let mut received = Vec::new();

        let result = dispatcher
            .dispatch(|payload, _| received.push(payload), &descriptor, ())
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(received, vec![json!({"value": 42})]);

        Ok(())
    }

    #[tokio::test]
    async fn dispatch_skips_continuation_on_application_error() -> Result<()> {
        let dispatcher = FixedReply::new(json!({"error": {"msg": "bad request"}}));
        let descriptor = RequestDescriptor::get("/x")?;
        let mut invoked = false;

        let result = dispatcher
            .dispatch(|_, _| invoked = true, &descriptor, ())
            .await;

        assert!(!invoked);
        assert_eq!(
            result,
            Err(DispatchError::Application(json!({"msg": "bad request"})))
        );

        Ok(())
    }

    #[tokio::test]
    async fn dispatch_forwards_extra_arguments() -> Result<()> {
        let dispatcher = FixedReply::new(json!({"value": 42}));
        let descriptor = RequestDescriptor::get("/x")?;

        let result = dispatcher
            .dispatch(
                |payload, (a, b): (&str, u32)| format!("{}-{}-{}", payload["value"], a, b),
                &descriptor,
                ("a", 7),
            )
            .await;

        assert_eq!(result, Ok("42-a-7".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn fetch_as_deserializes_payload() -> Result<()> {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Collectible {
            id: u64,
            name: String,
        }

        let dispatcher = FixedReply::new(json!({"id": 7, "name": "Golden ticket"}));
        let collectible: Collectible = dispatcher
            .fetch_as(&RequestDescriptor::get("/collectible/7")?)
            .await?;

        assert_eq!(
            collectible,
            Collectible {
                id: 7,
                name: "Golden ticket".into()
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn fetch_as_reports_shape_mismatch() -> Result<()> {
        let dispatcher = FixedReply::new(json!({"id": "not a number"}));
        let result = dispatcher
            .fetch_as::<Vec<u64>>(&RequestDescriptor::get("/collection/get")?)
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::MalformedResponse { status: None, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn shared_dispatcher_does_not_memoize() -> Result<()> {
        let dispatcher = Arc::new(FixedReply::new(json!([])));
        let descriptor = RequestDescriptor::get("/collection/get")?;

        dispatcher.fetch(&descriptor).await?;
        dispatcher.fetch(&descriptor).await?;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);

        Ok(())
    }
}
