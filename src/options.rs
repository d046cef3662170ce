use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Extensions, HeaderMap, Method};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::content::ContentKind;
use crate::error::Error;
use crate::response::Response;

pub(crate) type SerializeFn = Arc<dyn Fn(&Value) -> crate::Result<String> + Send + Sync>;
pub(crate) type ResponseHook = Arc<dyn Fn(Response) -> crate::Result<Response> + Send + Sync>;
pub(crate) type SuccessHook = Arc<dyn Fn(Response) -> Response + Send + Sync>;
pub(crate) type FailureHook = Arc<dyn Fn(Error) -> Error + Send + Sync>;

/// Credential policy forwarded to the transport.
///
/// Mirrors the fetch credentials modes. Transports without a cookie or auth
/// store are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials only to the request's own origin.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// Configuration for one request, or the base configuration of a
/// [`Client`](crate::Client).
///
/// An `Options` value only records what was explicitly set; everything left
/// unset is inherited along the configuration lineage (client base options,
/// then the built-in defaults) at dispatch time via [`Options::merge`].
///
/// Setters are chainable and infallible; an invalid value (bad header name,
/// unserializable body) is recorded and surfaces as a builder error when the
/// request is dispatched.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use reqkit::Options;
///
/// let options = Options::new()
///     .prefix_url("https://api.example")
///     .header("x-api-key", "sekrit")
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) method: Option<Method>,
    pub(crate) json: Option<Value>,
    pub(crate) params: Option<Value>,
    pub(crate) body: Option<Bytes>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) prefix_url: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) accept: Option<ContentKind>,
    pub(crate) serialize: Option<SerializeFn>,
    pub(crate) on_response: Option<ResponseHook>,
    pub(crate) on_success: Option<SuccessHook>,
    pub(crate) on_failure: Option<FailureHook>,
    pub(crate) token: Option<CancellationToken>,
    pub(crate) extensions: Extensions,
    pub(crate) error: Option<Error>,
}

impl Options {
    /// Constructs empty options: nothing set, everything inherited.
    pub fn new() -> Options {
        Options::default()
    }

    /// Set the HTTP method.
    ///
    /// Usually unnecessary: the shorthand methods on
    /// [`Client`](crate::Client) set it, and an unset method dispatches as
    /// GET. An explicitly set method wins over a shorthand's.
    pub fn method(mut self, method: Method) -> Options {
        self.method = Some(method);
        self
    }

    /// Set a JSON value to send as the request body.
    ///
    /// Encoded at dispatch time; forces the `content-type` header to
    /// `application/json`, overriding any caller-supplied value, and takes
    /// precedence over a raw [`body`](Options::body).
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Options {
        match serde_json::to_value(body) {
            Ok(value) => self.json = Some(value),
            Err(err) => self.error = Some(crate::error::builder(err)),
        }
        self
    }

    /// Set the query parameters.
    ///
    /// Turned into the query string at dispatch time by the
    /// [`serialize`](Options::serialize) callback. Across a merge, two plain
    /// JSON-object parameter sets are shallow-unioned (override wins per
    /// key); any other shape replaces wholesale.
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Options {
        match serde_json::to_value(params) {
            Ok(value) => self.params = Some(value),
            Err(err) => self.error = Some(crate::error::builder(err)),
        }
        self
    }

    /// Set a raw request body.
    pub fn body<T: Into<Bytes>>(mut self, body: T) -> Options {
        self.body = Some(body.into());
        self
    }

    /// Enables a request timeout.
    ///
    /// The timeout is applied from the first poll of the request's awaitable
    /// until the transport settles. A zero duration disables the timeout, as
    /// does leaving it unset.
    pub fn timeout(mut self, timeout: Duration) -> Options {
        self.timeout = Some(timeout);
        self
    }

    /// Set the prefix prepended to every request target in this lineage.
    ///
    /// The final URL is the plain concatenation `prefix + target + query`, so
    /// keep slashes explicit: `"https://api.example"` plus `"/users"`.
    pub fn prefix_url(mut self, prefix: impl Into<String>) -> Options {
        self.prefix_url = Some(prefix.into());
        self
    }

    /// Set a header. Header names are unique: setting one replaces any
    /// previous value under the same (case-insensitive) name.
    pub fn header<K, V>(mut self, key: K, value: V) -> Options
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let mut error = None;
        match <HeaderName as TryFrom<K>>::try_from(key) {
            Ok(key) => match <HeaderValue as TryFrom<V>>::try_from(value) {
                Ok(value) => {
                    self.headers.insert(key, value);
                }
                Err(e) => error = Some(e.into()),
            },
            Err(e) => error = Some(e.into()),
        }
        if let Some(err) = error {
            self.error = Some(crate::error::builder(err));
        }
        self
    }

    /// Insert all the given headers, replacing existing values under the same
    /// names.
    pub fn headers(mut self, headers: HeaderMap) -> Options {
        for (key, value) in headers.iter() {
            self.headers.insert(key, value.clone());
        }
        self
    }

    /// Set the credential policy forwarded to the transport.
    pub fn credentials(mut self, credentials: Credentials) -> Options {
        self.credentials = Some(credentials);
        self
    }

    /// Advertise a content kind in the `Accept` header.
    ///
    /// Headers are final at dispatch time, so negotiation is requested here
    /// rather than implied by which decode accessor gets called later.
    pub fn accept(mut self, kind: ContentKind) -> Options {
        self.accept = Some(kind);
        self
    }

    /// Replace the query serializer.
    ///
    /// The default encodes a JSON object as `key=value&...` pairs and passes
    /// a JSON string through verbatim; any other shape is a builder error.
    pub fn serialize<F>(mut self, serialize: F) -> Options
    where
        F: Fn(&Value) -> crate::Result<String> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    /// Replace the response hook.
    ///
    /// Runs once on every settled transport response, before
    /// [`on_success`](Options::on_success). The default raises a status error
    /// for anything outside the 2xx range; returning `Ok` passes the response
    /// on, returning `Err` rejects the request.
    pub fn on_response<F>(mut self, hook: F) -> Options
    where
        F: Fn(Response) -> crate::Result<Response> + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Replace the success hook: the final interception point for responses
    /// that made it through [`on_response`](Options::on_response). The default
    /// is the identity.
    pub fn on_success<F>(mut self, hook: F) -> Options
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Replace the failure hook: the final interception point for errors.
    ///
    /// The hook must re-raise: its return value is itself an [`Error`] the
    /// request settles with, so transforming is possible but swallowing is
    /// not.
    pub fn on_failure<F>(mut self, hook: F) -> Options
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Supply an external cancellation token.
    ///
    /// Cancelling it aborts the in-flight transport call (when the transport
    /// supports cancellation) and disarms any pending timeout; the request
    /// then settles with the transport's abort error, recognizable via
    /// [`Error::is_aborted`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Options {
        self.token = Some(token);
        self
    }

    /// Attach a typed, opaque value passed through to the transport on every
    /// request built from these options.
    pub fn extension<T>(mut self, extension: T) -> Options
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(extension);
        self
    }

    /// The configured method, if any.
    pub fn get_method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// The configured prefix URL, if any.
    pub fn get_prefix_url(&self) -> Option<&str> {
        self.prefix_url.as_deref()
    }

    /// The configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The configured headers.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The configured credential policy, if any.
    pub fn get_credentials(&self) -> Option<Credentials> {
        self.credentials
    }

    /// The configured query parameters, if any.
    pub fn get_params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Combine two configurations, `overrides` taking precedence.
    ///
    /// Pure: neither input is mutated. Every field set in `overrides`
    /// replaces the base's, with two exceptions: `headers` become the union
    /// of both sides (override wins per name), and JSON-object query params
    /// are shallow-unioned (override wins per key; non-object params replace
    /// wholesale). Fields absent from both stay absent.
    #[must_use]
    pub fn merge(&self, overrides: &Options) -> Options {
        let mut merged = self.clone();
        if let Some(ref method) = overrides.method {
            merged.method = Some(method.clone());
        }
        if let Some(ref json) = overrides.json {
            merged.json = Some(json.clone());
        }
        merged.params = merge_params(self.params.as_ref(), overrides.params.as_ref());
        if let Some(ref body) = overrides.body {
            merged.body = Some(body.clone());
        }
        if let Some(timeout) = overrides.timeout {
            merged.timeout = Some(timeout);
        }
        if let Some(ref prefix) = overrides.prefix_url {
            merged.prefix_url = Some(prefix.clone());
        }
        for (key, value) in overrides.headers.iter() {
            merged.headers.insert(key, value.clone());
        }
        if let Some(credentials) = overrides.credentials {
            merged.credentials = Some(credentials);
        }
        if let Some(accept) = overrides.accept {
            merged.accept = Some(accept);
        }
        if let Some(ref serialize) = overrides.serialize {
            merged.serialize = Some(serialize.clone());
        }
        if let Some(ref hook) = overrides.on_response {
            merged.on_response = Some(hook.clone());
        }
        if let Some(ref hook) = overrides.on_success {
            merged.on_success = Some(hook.clone());
        }
        if let Some(ref hook) = overrides.on_failure {
            merged.on_failure = Some(hook.clone());
        }
        if let Some(ref token) = overrides.token {
            merged.token = Some(token.clone());
        }
        merged.extensions.extend(overrides.extensions.clone());
        if let Some(ref error) = overrides.error {
            merged.error = Some(error.clone());
        }
        merged
    }

    pub(crate) fn fmt_fields(&self, f: &mut fmt::DebugStruct<'_, '_>) {
        if let Some(ref method) = self.method {
            f.field("method", method);
        }
        if let Some(ref prefix) = self.prefix_url {
            f.field("prefix_url", prefix);
        }
        if let Some(timeout) = self.timeout {
            f.field("timeout", &timeout);
        }
        if !self.headers.is_empty() {
            f.field("headers", &self.headers);
        }
        if let Some(credentials) = self.credentials {
            f.field("credentials", &credentials);
        }
        if let Some(accept) = self.accept {
            f.field("accept", &accept);
        }
        if let Some(ref params) = self.params {
            f.field("params", params);
        }
        if let Some(ref json) = self.json {
            f.field("json", json);
        }
        if self.body.is_some() {
            f.field("body", &"..");
        }
        if let Some(ref error) = self.error {
            f.field("error", error);
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Options");
        self.fmt_fields(&mut builder);
        builder.finish()
    }
}

/// Query params follow a "deep merge at the top level only" rule: two plain
/// objects are shallow-unioned, anything else replaces. A null override
/// counts as absent.
fn merge_params(base: Option<&Value>, overrides: Option<&Value>) -> Option<Value> {
    match (base, overrides) {
        (base, None) | (base, Some(Value::Null)) => base.cloned(),
        (Some(Value::Object(base)), Some(Value::Object(overrides))) => {
            let mut merged = base.clone();
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
            Some(Value::Object(merged))
        }
        (_, Some(value)) => Some(value.clone()),
    }
}

/// The baseline configuration merged beneath every dispatched request.
///
/// The behavior itself lives in the `default_*` items below so the executor
/// can name the same baseline when it resolves the merged options.
pub(crate) fn default_policy() -> Options {
    Options {
        prefix_url: Some(String::new()),
        credentials: Some(Credentials::SameOrigin),
        serialize: Some(Arc::new(default_serialize)),
        on_response: Some(Arc::new(default_on_response)),
        on_success: Some(Arc::new(default_on_success)),
        on_failure: Some(Arc::new(default_on_failure)),
        ..Options::default()
    }
}

pub(crate) fn default_serialize(params: &Value) -> crate::Result<String> {
    match params {
        // a preformatted query string passes through
        Value::String(params) => Ok(params.clone()),
        params => serde_urlencoded::to_string(params).map_err(crate::error::builder),
    }
}

pub(crate) fn default_on_response(res: Response) -> crate::Result<Response> {
    res.error_for_status()
}

pub(crate) fn default_on_success(res: Response) -> Response {
    res
}

pub(crate) fn default_on_failure(err: Error) -> Error {
    err
}
