#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

//! # reqkit
//!
//! The `reqkit` crate provides a configurable, higher-level HTTP request
//! pipeline over a pluggable transport.
//!
//! It handles the request plumbing that otherwise gets rewritten around
//! every HTTP client:
//!
//! - Layered request [`Options`] with per-setting inheritance
//! - Derived clients via [`Client::extend`]
//! - Deadlines raced against the transport, with cooperative cancellation
//! - Response hooks applied once, at settlement
//! - Lazy body decoding, one accessor per content kind
//!
//! The crate does not ship a transport. Anything that can turn a
//! [`Request`] into a future of a [`Response`] implements [`Transport`],
//! whether that is a connection pool, a local router, or a canned fixture.
//!
//! ## Dispatching requests
//!
//! ```
//! use reqkit::{Client, Options};
//! # use reqkit::{Request, Response, Sending, Transport};
//! # struct Loopback;
//! # impl Transport for Loopback {
//! #     fn send(&self, request: Request) -> Sending {
//! #         let url = request.url().clone();
//! #         Box::pin(async move {
//! #             let res = http::Response::builder()
//! #                 .status(200)
//! #                 .body(bytes::Bytes::from_static(b"{}"))?;
//! #             Ok(Response::new(res, url))
//! #         })
//! #     }
//! # }
//!
//! # async fn run() -> Result<(), reqkit::Error> {
//! let api = Client::with_options(
//!     Loopback,
//!     Options::new()
//!         .prefix_url("https://api.example")
//!         .header("authorization", "Bearer deadbeef"),
//! );
//!
//! // GET https://api.example/users?page=2
//! let users: serde_json::Value = api
//!     .get("/users", Options::new().query(&serde_json::json!({ "page": 2 })))
//!     .json()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Derived clients
//!
//! [`Client::extend`] layers additional options over a client's base
//! without touching the parent, so one configured client can fan out into
//! per-service variants that share its transport. Merging is per setting:
//! scalars from the child win, headers union key by key, and query params
//! union when both sides are objects.
//!
//! ## Deadlines
//!
//! A [`timeout`][Options::timeout] races the transport against a deadline.
//! When the transport cooperates (see
//! [`Transport::supports_cancellation`]), hitting the deadline also cancels
//! the in-flight request through a [`CancellationToken`]. A token supplied
//! by the caller aborts the request the same way.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub use http::header;
pub use http::Method;
pub use http::StatusCode;
pub use tokio_util::sync::CancellationToken;
pub use url::Url;

pub use self::client::{Client, Pending};
pub use self::content::ContentKind;
pub use self::error::{Aborted, Error, Result};
pub use self::options::{Credentials, Options};
pub use self::request::Request;
pub use self::response::Response;
pub use self::transport::{Sending, Transport};

mod client;
mod content;
mod error;
mod options;
mod request;
mod response;
mod transport;
