//! HTTP value types and the outbound pipeline seams.
//!
//! A client sends an [HttpRequest] through an ordered chain of
//! [DelegatingHandler]s before it reaches the real [Transport]. The recorder
//! injects itself as one of those handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ids::HandlerId;
use crate::Error;

/// Response headers. Order carries no meaning, so they are kept sorted.
pub type Headers = BTreeMap<String, String>;

/// An outbound HTTP request as issued by a client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Path including any `?query` component.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn put(path: &str) -> Self {
        Self::new("PUT", path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new("DELETE", path)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A response returned by a transport or replayed from a recording.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Body as UTF-8 text, lossy for binary payloads.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The real network. Timeouts and cancellation belong to implementations.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// A stage in a client's outbound pipeline.
pub trait DelegatingHandler: Send + Sync + fmt::Debug {
    fn id(&self) -> HandlerId;

    /// Handles `request`, optionally delegating to `next`.
    fn handle(&self, request: &HttpRequest, next: &dyn Transport) -> Result<HttpResponse, Error>;
}

/// The remainder of a handler chain, presented to a handler as a transport.
pub(crate) struct Next<'a> {
    handlers: &'a [Arc<dyn DelegatingHandler>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn DelegatingHandler>], transport: &'a dyn Transport) -> Self {
        Self { handlers, transport }
    }
}

impl Transport for Next<'_> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        match self.handlers.split_first() {
            Some((handler, rest)) => handler.handle(request, &Next::new(rest, self.transport)),
            None => self.transport.send(request),
        }
    }
}
