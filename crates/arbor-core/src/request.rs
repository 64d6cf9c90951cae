//! The request as seen by the dispatcher.
//!
//! [`Request`] is a transport-neutral view of an HTTP request: method,
//! percent-decoded path, raw query string, headers and body. It is built
//! from an `http::Request<Bytes>` by the transport, or directly by tests.

use crate::error::{DispatchError, DispatchResult};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat request parameters in insertion order.
pub type Params = IndexMap<String, Value>;

/// Header carrying the scheme seen by a fronting proxy.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Which source wins when the query string and the form body both supply
/// the same parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamPrecedence {
    /// The form body is merged last, so its value wins.
    #[default]
    FormWins,
    /// The query string value is kept.
    QueryWins,
}

/// An incoming request.
///
/// # Example
///
/// ```
/// use arbor_core::Request;
/// use http::Method;
///
/// let request = Request::new(Method::GET, "/users/caf%C3%A9?page=2");
/// assert_eq!(request.path(), "/users/café");
/// assert_eq!(request.query_string(), Some("page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Creates a request for `target`, a path with an optional query string.
    ///
    /// A path that does not percent-decode to UTF-8 is kept verbatim.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path: decode_path(path),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Converts an `http` request.
    ///
    /// Fails with `400 Bad Request` if the path does not decode to UTF-8.
    pub fn from_http(request: http::Request<Bytes>) -> DispatchResult<Self> {
        let (parts, body) = request.into_parts();
        let path = urlencoding::decode(parts.uri.path())
            .map_err(|e| DispatchError::bad_request(format!("malformed request path: {e}")))?
            .into_owned();

        Ok(Self {
            method: parts.method,
            path,
            query: parts.uri.query().map(ToString::to_string),
            headers: parts.headers,
            body,
        })
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the percent-decoded path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string, without the `?`.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the media type of the body, without parameters.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// Returns `true` if the body is an url-encoded form.
    #[must_use]
    pub fn has_form_body(&self) -> bool {
        self.media_type()
            .is_some_and(|m| m.eq_ignore_ascii_case("application/x-www-form-urlencoded"))
    }

    /// Returns the scheme, honoring `X-Forwarded-Proto`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.header(X_FORWARDED_PROTO)
            .map(|v| v.split(',').next().unwrap_or(v).trim())
            .filter(|v| !v.is_empty())
            .unwrap_or("http")
    }

    /// Returns the `Host` header.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.header(HOST.as_str())
    }

    /// Points the request at a new location (path plus optional query).
    pub fn set_location(&mut self, location: &str) {
        let (path, query) = split_target(location);
        self.path = decode_path(path);
        self.query = query;
    }

    /// Turns the request into a body-less `GET`.
    pub fn convert_to_get(&mut self) {
        self.method = Method::GET;
        self.body = Bytes::new();
        self.headers.remove(CONTENT_TYPE);
        self.headers.remove(CONTENT_LENGTH);
    }
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned())
}

fn split_target(target: &str) -> (&str, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    }
}
