use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Alias for the `Future` type returned by [`Transport::send`].
pub type Sending = Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>;

/// Trait for the primitive that actually carries a [`Request`].
///
/// The pipeline treats transports as opaque: anything that takes a built
/// request and asynchronously produces a [`Response`] (or fails) can back a
/// [`Client`](crate::Client). Since trait objects cannot make use of
/// associated types, the returned future is boxed via the [`Sending`] alias.
///
/// A transport that observes its request's cancellation token reports the
/// cancellation by failing with an error whose source chain contains
/// [`Aborted`](crate::Aborted); callers classify such failures with
/// [`Error::is_aborted`](crate::Error::is_aborted).
pub trait Transport: Send + Sync {
    /// Dispatches one request.
    ///
    /// The returned future may be dropped before completion when the race
    /// around it settles first; implementations must tolerate that.
    fn send(&self, request: Request) -> Sending;

    /// Whether this transport observes [`Request::token`] cancellation.
    ///
    /// Consulted once per dispatch. When false, a configured timeout still
    /// settles the awaitable on time, but nothing signals the transport to
    /// stop the in-flight call.
    fn supports_cancellation(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> Sending {
        (**self).send(request)
    }

    fn supports_cancellation(&self) -> bool {
        (**self).supports_cancellation()
    }
}
