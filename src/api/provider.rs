// SPDX-License-Identifier: GPL-3.0-or-later

use crate::api::dispatcher::Dispatcher;
use anyhow::Result;

/// A generic trait to create [Dispatcher] impls.
///
/// This interface is useful for implementations that hold state outside a particular dispatcher,
/// for example a simulated backend shared by every dispatcher created in a test.
///
/// Simple providers that can define the configuration needed for the [Dispatcher] in the
/// [DispatcherBuilder] implementation don't need to override `create_dispatcher`.
///
/// #Example
///
/// ```
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use tradepost::api::provider::*;
/// use tradepost::api::{DispatchError, Dispatcher, RequestDescriptor};
///
/// let provider = EchoProvider {};
/// let dispatcher = provider.create_dispatcher(EchoBuilder {}).unwrap();
///
/// pub struct EchoProvider {}
///
/// impl DispatcherProvider<EchoDispatcher> for EchoProvider {}
///
/// pub struct EchoDispatcher {}
///
/// pub struct EchoBuilder {}
///
/// impl DispatcherBuilder<EchoDispatcher> for EchoBuilder {
///     fn build(self) -> Result<EchoDispatcher> {
///         Ok(EchoDispatcher {})
///     }
/// }
///
/// #[async_trait]
/// impl Dispatcher for EchoDispatcher {
///     async fn round_trip(&self, descriptor: &RequestDescriptor) -> Result<Value, DispatchError> {
///         Ok(json!({"route": descriptor.route()}))
///     }
/// }
/// ```
pub trait DispatcherProvider<T: Dispatcher> {
    fn create_dispatcher<U: DispatcherBuilder<T>>(&self, builder: U) -> Result<T> {
        builder.build()
    }
}

/// Builder for a [Dispatcher] impl.
///
/// See [DispatcherProvider] for an example on how this can be used to create a dispatcher from a
/// provider.
pub trait DispatcherBuilder<T: Dispatcher> {
    fn build(self) -> Result<T>;
}
