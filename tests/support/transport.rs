use std::future;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use reqkit::{Aborted, Request, Response, Sending, Transport};

fn aborted() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(Aborted)
}

/// A canned transport: every dispatch is recorded, then settles with the
/// configured response after an optional delay. While waiting it honors the
/// request's cancellation token the way a real connection would.
pub struct Mock {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    delay: Option<Duration>,
    never: bool,
    cancellable: bool,
    requests: Mutex<Vec<Request>>,
}

impl Mock {
    pub fn new() -> Mock {
        Mock {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            delay: None,
            never: false,
            cancellable: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn status(mut self, status: u16) -> Mock {
        self.status = StatusCode::from_u16(status).unwrap();
        self
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Mock {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn body(mut self, body: &'static str) -> Mock {
        self.body = Bytes::from_static(body.as_bytes());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Mock {
        self.delay = Some(delay);
        self
    }

    /// The transport never settles on its own.
    pub fn never_settles(mut self) -> Mock {
        self.never = true;
        self
    }

    /// Dispatches run to completion even when a token asks them to stop.
    pub fn without_cancellation(mut self) -> Mock {
        self.cancellable = false;
        self
    }

    /// Everything dispatched through this transport, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for Mock {
    fn send(&self, request: Request) -> Sending {
        let url = request.url().clone();
        let token = request.token().cloned();
        let status = self.status;
        let headers = self.headers.clone();
        let body = self.body.clone();
        let delay = self.delay;
        let never = self.never;
        self.requests.lock().unwrap().push(request);

        Box::pin(async move {
            if never {
                match token.as_ref() {
                    Some(token) => token.cancelled().await,
                    None => future::pending().await,
                }
                return Err(aborted());
            }
            if let Some(delay) = delay {
                match token.as_ref() {
                    Some(token) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => return Err(aborted()),
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }

            let mut builder = http::Response::builder().status(status);
            for (name, value) in headers.iter() {
                builder = builder.header(name, value);
            }
            let res = builder.body(body).unwrap();
            Ok(Response::new(res, url))
        })
    }

    fn supports_cancellation(&self) -> bool {
        self.cancellable
    }
}
