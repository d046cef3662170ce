use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_core::future::BoxFuture;
use futures_util::future::Shared;
use futures_util::FutureExt;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use log::{debug, trace};
use pin_project_lite::pin_project;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Sleep;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use url::Url;

use crate::content::ContentKind;
use crate::error::{self, Error};
use crate::options::{default_on_failure, default_on_response, default_on_success};
use crate::options::{default_policy, default_serialize, Options};
use crate::options::{FailureHook, ResponseHook, SuccessHook};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Sending, Transport};

/// A configurable dispatcher for HTTP requests.
///
/// A `Client` pairs a [`Transport`] with an accumulated set of base
/// [`Options`]. Every dispatch resolves its options from three layers,
/// lowest priority first: the built-in defaults, the client's base options,
/// and the per-call options. [`extend`][Client::extend] derives a child
/// client whose own additions layer over the parent's base without touching
/// the parent.
///
/// The transport and base options live behind an `Arc`, so a `Client` is
/// cheap to clone and share across tasks.
///
/// # Example
///
/// ```
/// use reqkit::{Client, Options, Request, Response, Sending, Transport};
///
/// struct Loopback;
///
/// impl Transport for Loopback {
///     fn send(&self, request: Request) -> Sending {
///         let url = request.url().clone();
///         Box::pin(async move {
///             let res = http::Response::builder()
///                 .status(200)
///                 .header("content-type", "application/json")
///                 .body(bytes::Bytes::from_static(b"{\"ok\":true}"))?;
///             Ok(Response::new(res, url))
///         })
///     }
/// }
///
/// # async fn run() -> Result<(), reqkit::Error> {
/// let api = Client::with_options(
///     Loopback,
///     Options::new().prefix_url("https://api.example"),
/// );
/// let health: serde_json::Value = api.get("/health", Options::new()).json().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

struct ClientRef {
    transport: Arc<dyn Transport>,
    options: Options,
}

impl Client {
    /// Constructs a new `Client` over `transport` with empty base options.
    pub fn new<T>(transport: T) -> Client
    where
        T: Transport + 'static,
    {
        Client::with_options(transport, Options::new())
    }

    /// Constructs a new `Client` over `transport` with the given base options.
    pub fn with_options<T>(transport: T, options: Options) -> Client
    where
        T: Transport + 'static,
    {
        Client {
            inner: Arc::new(ClientRef {
                transport: Arc::new(transport),
                options,
            }),
        }
    }

    /// Derives a child `Client` sharing this client's transport, with
    /// `options` merged over this client's base options.
    ///
    /// The parent is left untouched. Layering is per setting: scalars in
    /// `options` win, headers union key by key, query params union when both
    /// sides are objects.
    pub fn extend(&self, options: Options) -> Client {
        Client {
            inner: Arc::new(ClientRef {
                transport: self.inner.transport.clone(),
                options: self.inner.options.merge(&options),
            }),
        }
    }

    /// Derives a child `Client`, exactly like [`extend`][Client::extend].
    ///
    /// Offered so call sites that construct clients from a shared base can
    /// use the same verb as the constructors.
    pub fn create(&self, options: Options) -> Client {
        self.extend(options)
    }

    /// Returns the accumulated base options.
    ///
    /// These are the options as layered by construction and
    /// [`extend`][Client::extend], without the built-in defaults. Defaults
    /// are folded in at dispatch time.
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Dispatches a request to `target` without forcing any method.
    ///
    /// The method comes from the merged options; absent one, the request
    /// goes out as a `GET`.
    pub fn request(&self, target: &str, options: Options) -> Pending {
        self.execute(target, self.inner.options.merge(&options))
    }

    /// Convenience method to dispatch a `GET` request to `target`.
    pub fn get(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::GET, target, options)
    }

    /// Convenience method to dispatch a `POST` request to `target`.
    pub fn post(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::POST, target, options)
    }

    /// Convenience method to dispatch a `PUT` request to `target`.
    pub fn put(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::PUT, target, options)
    }

    /// Convenience method to dispatch a `PATCH` request to `target`.
    pub fn patch(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::PATCH, target, options)
    }

    /// Convenience method to dispatch a `HEAD` request to `target`.
    pub fn head(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::HEAD, target, options)
    }

    /// Convenience method to dispatch a `DELETE` request to `target`.
    pub fn delete(&self, target: &str, options: Options) -> Pending {
        self.shorthand(Method::DELETE, target, options)
    }

    // The forced method sits below the per-call options, so an explicit
    // `options.method()` still wins over the shorthand.
    fn shorthand(&self, method: Method, target: &str, options: Options) -> Pending {
        self.request(target, Options::new().method(method).merge(&options))
    }

    fn execute(&self, target: &str, options: Options) -> Pending {
        let options = default_policy().merge(&options);
        let Options {
            method,
            json,
            params,
            body,
            timeout,
            prefix_url,
            mut headers,
            credentials,
            accept,
            serialize,
            on_response,
            on_success,
            on_failure,
            token,
            extensions,
            error,
        } = options;

        // An error recorded while building options settles the dispatch
        // before anything reaches the transport.
        if let Some(err) = error {
            return Pending::new_err(err);
        }

        // The default policy merge above supplies all four; the fallbacks
        // name the same baseline items.
        let serialize = serialize.unwrap_or_else(|| Arc::new(default_serialize));
        let on_response = on_response.unwrap_or_else(|| Arc::new(default_on_response));
        let on_success = on_success.unwrap_or_else(|| Arc::new(default_on_success));
        let on_failure = on_failure.unwrap_or_else(|| Arc::new(default_on_failure));

        let query = match params {
            None | Some(Value::Null) => None,
            Some(ref params) => match (&*serialize)(params) {
                Ok(query) => Some(query),
                Err(err) => return Pending::new_err(err),
            },
        };

        let mut address = prefix_url.unwrap_or_default();
        address.push_str(target);
        if let Some(ref query) = query {
            address.push('?');
            address.push_str(query);
        }
        let url = match Url::parse(&address) {
            Ok(url) => url,
            Err(err) => return Pending::new_err(error::builder(err)),
        };

        let body = match json {
            Some(ref json) if !json.is_null() => match serde_json::to_vec(json) {
                Ok(body) => {
                    headers.insert(CONTENT_TYPE, ContentKind::Json.header_value());
                    Some(Bytes::from(body))
                }
                Err(err) => return Pending::new_err(error::builder(err)),
            },
            _ => body,
        };
        if let Some(kind) = accept {
            headers.insert(ACCEPT, kind.header_value());
        }

        let timeout = timeout.filter(|timeout| !timeout.is_zero());

        // With a deadline and a cooperating transport, the transport observes
        // an internal token that fires on the deadline or on a caller abort.
        // Otherwise the caller's own token is handed through untouched.
        let mut internal_token = None;
        let mut caller_abort = None;
        let request_token = if timeout.is_some() && self.inner.transport.supports_cancellation() {
            let cancel = CancellationToken::new();
            internal_token = Some(cancel.clone());
            caller_abort = token.map(|token| Box::pin(token.cancelled_owned()));
            Some(cancel)
        } else {
            token
        };

        let mut request = Request::new(method.unwrap_or(Method::GET), url.clone());
        *request.headers_mut() = headers;
        *request.body_mut() = body;
        if let Some(credentials) = credentials {
            *request.credentials_mut() = credentials;
        }
        *request.token_mut() = request_token;
        *request.extensions_mut() = extensions;

        debug!("dispatching {} {}", request.method(), request.url());
        let in_flight = self.inner.transport.send(request);

        Pending::new(PendingRequest {
            url,
            timeout,
            on_response,
            on_success,
            on_failure,
            internal_token,
            in_flight,
            delay: None,
            caller_abort,
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Client");
        self.inner.options.fmt_fields(&mut builder);
        builder.finish()
    }
}

pin_project! {
    struct PendingRequest {
        url: Url,
        timeout: Option<Duration>,
        on_response: ResponseHook,
        on_success: SuccessHook,
        on_failure: FailureHook,
        internal_token: Option<CancellationToken>,
        #[pin]
        in_flight: Sending,
        #[pin]
        delay: Option<Pin<Box<Sleep>>>,
        #[pin]
        caller_abort: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    }
}

impl PendingRequest {
    fn settle_response(&self, response: Response) -> Result<Response, Error> {
        let on_response = &*self.on_response;
        match on_response(response) {
            Ok(response) => {
                let on_success = &*self.on_success;
                Ok(on_success(response))
            }
            Err(err) => Err(self.settle_failure(err)),
        }
    }

    fn settle_failure(&self, err: Error) -> Error {
        let on_failure = &*self.on_failure;
        on_failure(err)
    }
}

impl Future for PendingRequest {
    type Output = Result<Response, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The deadline is armed on first poll, so the clock starts when the
        // caller starts awaiting rather than at dispatch.
        if let Some(timeout) = self.as_mut().project().timeout.take() {
            let delay = Box::pin(tokio::time::sleep(timeout));
            self.as_mut().project().delay.set(Some(delay));
        }

        let deadline_hit = match self.as_mut().project().delay.as_mut().as_pin_mut() {
            Some(delay) => delay.poll(cx).is_ready(),
            None => false,
        };
        if deadline_hit {
            debug!("request to {} hit its deadline", self.url);
            if let Some(cancel) = self.internal_token.as_ref() {
                cancel.cancel();
            }
            let err = error::timedout(self.url.clone());
            return Poll::Ready(Err(self.settle_failure(err)));
        }

        // A caller abort fans out to the transport token and disarms the
        // deadline. Settlement then comes from the transport's own abort
        // error, not from here.
        let caller_cancelled = match self.as_mut().project().caller_abort.as_mut().as_pin_mut() {
            Some(abort) => abort.poll(cx).is_ready(),
            None => false,
        };
        if caller_cancelled {
            trace!("caller cancelled request to {}", self.url);
            if let Some(cancel) = self.internal_token.as_ref() {
                cancel.cancel();
            }
            let mut this = self.as_mut().project();
            this.delay.set(None);
            this.caller_abort.set(None);
        }

        let polled = self.as_mut().project().in_flight.poll(cx);
        match polled {
            Poll::Ready(Ok(response)) => Poll::Ready(self.settle_response(response)),
            Poll::Ready(Err(err)) => {
                let err = error::request(err, self.url.clone());
                Poll::Ready(Err(self.settle_failure(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An in-flight request settling to a hook-processed [`Response`].
///
/// Awaiting the `Pending` itself yields the `Response`. The decode
/// accessors await the same single settlement and each decode their own
/// clone of the buffered response, so reading the body as JSON and then as
/// text observes the same response twice rather than consuming it.
///
/// `Pending` is cheap to clone; clones share the settlement.
#[derive(Clone)]
pub struct Pending {
    inner: Shared<BoxFuture<'static, Result<Response, Error>>>,
}

impl Pending {
    fn new(fut: PendingRequest) -> Pending {
        let fut: BoxFuture<'static, Result<Response, Error>> = Box::pin(fut);
        Pending {
            inner: fut.shared(),
        }
    }

    fn new_err(err: Error) -> Pending {
        let fut: BoxFuture<'static, Result<Response, Error>> = Box::pin(future::ready(Err(err)));
        Pending {
            inner: fut.shared(),
        }
    }

    /// Awaits the settlement and deserializes the response body as JSON.
    pub async fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        self.inner.clone().await?.json()
    }

    /// Awaits the settlement and returns the response body as text.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn text(&self) -> crate::Result<String> {
        Ok(self.inner.clone().await?.text())
    }

    /// Awaits the settlement and deserializes the response body as form
    /// data.
    pub async fn form<T: DeserializeOwned>(&self) -> crate::Result<T> {
        self.inner.clone().await?.form()
    }

    /// Awaits the settlement and returns the raw response body.
    pub async fn bytes(&self) -> crate::Result<Bytes> {
        Ok(self.inner.clone().await?.bytes())
    }

    /// Awaits the settlement and returns the response body as an opaque
    /// blob.
    ///
    /// Bodies are fully buffered, so this is the same payload as
    /// [`bytes`][Pending::bytes]. Both exist for parity with the content
    /// kinds.
    pub async fn blob(&self) -> crate::Result<Bytes> {
        self.bytes().await
    }
}

impl Future for Pending {
    type Output = crate::Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}
