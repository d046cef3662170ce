use std::fmt;

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Extensions, HeaderMap};
use serde::de::DeserializeOwned;
use url::Url;

use crate::StatusCode;

/// A response produced by a [`Transport`](crate::Transport).
///
/// Fully buffered: status, headers, and body bytes are owned, so cloning is
/// cheap (`Bytes` clones are refcounted). Decode methods consume the
/// response; clone first to decode the same body more than once, which is
/// exactly what the accessors on [`Pending`](crate::Pending) do.
#[derive(Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Box<Url>,
    body: Bytes,
    extensions: Extensions,
}

impl Response {
    /// Assembles a response from an `http::Response` and the request's final
    /// URL. This is the constructor transports use.
    pub fn new(res: http::Response<Bytes>, url: Url) -> Response {
        let (parts, body) = res.into_parts();
        Response {
            status: parts.status,
            headers: parts.headers,
            url: Box::new(url),
            body,
            extensions: parts.extensions,
        }
    }

    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the final `Url` of this `Response`.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the content length, as declared by the `Content-Length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse().ok())
    }

    /// Get the extensions attached by the transport.
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Get a mutable reference to the extensions.
    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Get a reference to the body bytes as received.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the full response body as `Bytes`.
    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// Try to deserialize the response body as JSON.
    pub fn json<T: DeserializeOwned>(self) -> crate::Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| crate::error::decode(e, (*self.url).clone()))
    }

    /// Get the response text.
    ///
    /// The body is interpreted as UTF-8; invalid sequences are replaced with
    /// the replacement character.
    pub fn text(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Try to deserialize the response body as `www-form-urlencoded` data.
    pub fn form<T: DeserializeOwned>(self) -> crate::Result<T> {
        serde_urlencoded::from_bytes(&self.body)
            .map_err(|e| crate::error::decode(e, (*self.url).clone()))
    }

    /// Turn a response into an error if the server returned a status outside
    /// the 2xx range.
    ///
    /// This is what the default response hook applies to every settled
    /// transport call. The returned error keeps the full response; see
    /// [`Error::response`](crate::Error::response).
    pub fn error_for_status(self) -> crate::Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(crate::error::status(self))
        }
    }

    /// Turn a reference to a response into an error if the server returned a
    /// status outside the 2xx range.
    pub fn error_for_status_ref(&self) -> crate::Result<&Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(crate::error::status(self.clone()))
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn response(status: u16, body: &'static [u8]) -> Response {
        let url = Url::parse("https://api.test/data").unwrap();
        let res = http::Response::builder()
            .status(status)
            .body(Bytes::from_static(body))
            .unwrap();
        Response::new(res, url)
    }

    #[test]
    fn decodes_json() {
        #[derive(Deserialize)]
        struct User {
            id: u32,
            name: String,
        }

        let res = response(200, b"{\"id\":7,\"name\":\"sara\"}");
        let user: User = res.json().unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "sara");
    }

    #[test]
    fn json_decode_failure_classified() {
        let res = response(200, b"not json");
        let err = res.json::<serde_json::Value>().unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.url().unwrap().as_str(), "https://api.test/data");
    }

    #[test]
    fn decodes_text_lossily() {
        let res = response(200, b"plain text");
        assert_eq!(res.text(), "plain text");

        let res = response(200, b"bad \xfe utf8");
        assert_eq!(res.text(), "bad \u{fffd} utf8");
    }

    #[test]
    fn decodes_form() {
        #[derive(Deserialize)]
        struct Login {
            user: String,
            attempts: u8,
        }

        let res = response(200, b"user=ana&attempts=3");
        let login: Login = res.form().unwrap();
        assert_eq!(login.user, "ana");
        assert_eq!(login.attempts, 3);
    }

    #[test]
    fn clones_decode_independently() {
        let res = response(200, b"{\"ok\":true}");
        let value: serde_json::Value = res.clone().json().unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(res.text(), "{\"ok\":true}");
    }

    #[test]
    fn error_for_status_is_strict_2xx() {
        assert!(response(200, b"").error_for_status().is_ok());
        assert!(response(204, b"").error_for_status().is_ok());

        let err = response(404, b"missing").error_for_status().unwrap_err();
        assert!(err.is_status());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        // without redirect handling a 3xx reaching the hook is a failure
        let err = response(302, b"").error_for_status().unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FOUND));
    }

    #[test]
    fn error_for_status_ref_keeps_body_readable() {
        let res = response(500, b"boom");
        let err = res.error_for_status_ref().unwrap_err();
        assert_eq!(err.response().unwrap().body().as_ref(), b"boom");
        // original response still usable
        assert_eq!(res.text(), "boom");
    }

    #[test]
    fn content_length_from_header() {
        let url = Url::parse("https://api.test/head").unwrap();
        let res = http::Response::builder()
            .status(200)
            .header(CONTENT_LENGTH, "42")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Response::new(res, url).content_length(), Some(42));

        assert_eq!(response(200, b"xy").content_length(), None);
    }
}
