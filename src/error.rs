use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

use url::Url;

use crate::response::Response;
use crate::StatusCode;

/// A `Result` alias where the `Err` case is `reqkit::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that may occur when building, dispatching, or decoding a request.
///
/// Errors are cheaply clonable (the payload lives behind an `Arc`) so that a
/// settled [`Pending`](crate::Pending) can hand the same failure to every
/// awaiter and decode accessor.
///
/// Note: errors may include the full URL used to make the request. If the URL
/// contains sensitive information (e.g. an API key as a query parameter), be
/// careful when logging them.
#[derive(Clone)]
pub struct Error {
    inner: Arc<Inner>,
}

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>, url: Option<Url>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Arc::new(Inner {
                kind,
                source: source.map(Into::into),
                url,
            }),
        }
    }

    /// Constructs an error from a response the caller considers a failure.
    ///
    /// This is what the default response hook raises for a non-2xx status; it
    /// is public so custom hooks and tests can build or compare the same
    /// failure shape.
    pub fn from_response(response: Response) -> Error {
        status(response)
    }

    /// Constructs the error a request settles with when its deadline elapses.
    ///
    /// Carries no payload; its message is always `"Request timed out"`.
    pub fn timed_out() -> Error {
        Error::new(Kind::Timeout, None::<Error>, None)
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status(ref response) => Some(response.status()),
            _ => None,
        }
    }

    /// Returns the response this error was generated from, if any.
    ///
    /// The response is fully buffered, so its status, headers, and body remain
    /// inspectable from the error alone.
    pub fn response(&self) -> Option<&Response> {
        match self.inner.kind {
            Kind::Status(ref response) => Some(response),
            _ => None,
        }
    }

    /// Returns true if the error arose while the request was being built.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error came from the transport while sending.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error was generated from a response status.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status(_))
    }

    /// Returns true if the error came from decoding a response body.
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if the error is related to a timeout.
    ///
    /// True for the deadline raced by the executor, and also for
    /// transport-level timeouts surfacing as [`io::ErrorKind::TimedOut`]
    /// anywhere in the source chain.
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }
        let mut source = self.source();
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::TimedOut {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }

    /// Returns true if the request was cancelled before the transport settled.
    ///
    /// Cancellation originates in the transport: one that observes its
    /// request's token reports back with [`Aborted`] in its error chain, and
    /// this predicate recognizes it. Timeout and status failures are not
    /// aborts.
    pub fn is_aborted(&self) -> bool {
        let mut source = self.source();
        while let Some(err) = source {
            if err.is::<Aborted>() {
                return true;
            }
            source = err.source();
        }
        false
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("reqkit::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", url);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::Timeout => f.write_str("Request timed out")?,
            Kind::Status(ref response) => {
                let status = response.status();
                let prefix = if status.is_client_error() {
                    "HTTP status client error"
                } else if status.is_server_error() {
                    "HTTP status server error"
                } else {
                    "HTTP status error"
                };
                write!(f, "{prefix} ({status})")?;
            }
        };
        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Request,
    Status(Response),
    Decode,
    Timeout,
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e), None)
}

pub(crate) fn request<E: Into<BoxError>>(e: E, url: Url) -> Error {
    Error::new(Kind::Request, Some(e), Some(url))
}

pub(crate) fn decode<E: Into<BoxError>>(e: E, url: Url) -> Error {
    Error::new(Kind::Decode, Some(e), Some(url))
}

pub(crate) fn status(response: Response) -> Error {
    let url = response.url().clone();
    Error::new(Kind::Status(response), None::<Error>, Some(url))
}

pub(crate) fn timedout(url: Url) -> Error {
    Error::new(Kind::Timeout, None::<Error>, Some(url))
}

/// Marker a transport reports when a request was cancelled mid-flight.
///
/// The executor never constructs this itself. A [`Transport`](crate::Transport)
/// that observes its request's cancellation token should fail with `Aborted`
/// (or an error whose chain contains it); callers then classify the failure
/// with [`Error::is_aborted`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Aborted;

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Aborted")
    }
}

impl StdError for Aborted {}
