//! The result of merging request options with client defaults.
//!
//! Preparing a request is pure: it reads the current access token but performs
//! no I/O and triggers no side effects. What comes out is exactly what will be
//! handed to the transport.

use crate::options::MultipartForm;
use http::{HeaderMap, Method};
use url::Url;

/// A fully merged request, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// The HTTP method.
    pub method: Method,

    /// The absolute URL, with query parameters applied.
    pub url: Url,

    /// The final outgoing headers.
    pub headers: HeaderMap,

    /// The serialized body.
    pub body: PreparedBody,
}

impl PreparedRequest {
    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// A request body after serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    /// No body.
    Empty,
    /// Text, either passed through or produced by JSON serialization.
    Text(String),
    /// Raw bytes, passed through.
    Bytes(Vec<u8>),
    /// A multipart form, passed through.
    Multipart(MultipartForm),
}

impl PreparedBody {
    /// Returns the body as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PreparedBody::Text(text) => Some(text),
            _ => None,
        }
    }
}
