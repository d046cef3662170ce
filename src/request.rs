use std::fmt;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::options::Credentials;

/// A request ready to hand to a [`Transport`](crate::Transport).
///
/// Built by the executor from a fully merged [`Options`](crate::Options):
/// final URL (prefix, target, query string), headers, encoded body. Transports
/// consume it; transports that wrap other transports may rewrite it through
/// the `_mut` accessors.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    credentials: Credentials,
    token: Option<CancellationToken>,
    extensions: Extensions,
}

impl Request {
    /// Constructs a new request.
    #[inline]
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            credentials: Credentials::default(),
            token: None,
            extensions: Extensions::new(),
        }
    }

    /// Get the method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get a mutable reference to the method.
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Get the url.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a mutable reference to the url.
    #[inline]
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body, if any.
    #[inline]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Get a mutable reference to the body.
    #[inline]
    pub fn body_mut(&mut self) -> &mut Option<Bytes> {
        &mut self.body
    }

    /// Get the credentials policy.
    #[inline]
    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    /// Get a mutable reference to the credentials policy.
    #[inline]
    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    /// Get the cancellation token the transport should observe, if any.
    ///
    /// When the executor races a timeout it hands the transport an internal
    /// token (cancelled on deadline or caller abort); otherwise this is the
    /// caller's own token, forwarded as-is.
    #[inline]
    pub fn token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    /// Get a mutable reference to the cancellation token.
    #[inline]
    pub fn token_mut(&mut self) -> &mut Option<CancellationToken> {
        &mut self.token
    }

    /// Get the extensions: opaque, typed pass-through settings for the
    /// transport.
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Get a mutable reference to the extensions.
    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish()
    }
}
