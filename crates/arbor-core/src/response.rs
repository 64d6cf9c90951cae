//! The response produced by a dispatch cycle.

use crate::error::DispatchError;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};

/// A response body.
///
/// Textual handler results become [`Body::Text`]; binary results keep
/// their bytes untouched in [`Body::Binary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A UTF-8 body.
    Text(String),
    /// A binary-safe body.
    Binary(Bytes),
}

impl Body {
    /// Returns `true` if the body has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }

    /// Returns the body as text, if it is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Converts the body into bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

/// A response under construction.
///
/// # Example
///
/// ```
/// use arbor_core::{Body, Response};
/// use http::StatusCode;
///
/// let response = Response::new()
///     .with_status(StatusCode::CREATED)
///     .with_content_type("text/plain")
///     .with_body("done");
///
/// let http_response = response.into_http();
/// assert_eq!(http_response.status(), StatusCode::CREATED);
/// assert_eq!(http_response.headers()["content-type"], "text/plain");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    content_type: Option<String>,
    body: Body,
}

impl Response {
    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the response for a status-bearing error.
    ///
    /// Returns `None` for errors that do not carry an HTTP status.
    #[must_use]
    pub fn for_error(error: &DispatchError) -> Option<Self> {
        let status = error.status_code()?;
        let mut response = Self::new()
            .with_status(status)
            .with_content_type("text/plain");

        match error {
            DispatchError::Redirect { location, .. } => {
                if let Ok(value) = HeaderValue::from_str(&encode_location(location)) {
                    response.headers.insert(LOCATION, value);
                }
            }
            DispatchError::NotFound { message } => {
                response.body = Body::Text(format!("404 Not Found\n\n{message}"));
            }
            DispatchError::Http { status, detail } => {
                let reason = status.canonical_reason().unwrap_or("Error");
                response.body = Body::Text(format!("{} {reason}\n\n{detail}", status.as_u16()));
            }
            _ => {}
        }
        Some(response)
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Sets the body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Converts into an `http` response.
    ///
    /// A content type that is not a valid header value is dropped.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body.into_bytes());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if let Some(value) = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }
}

/// Percent-encodes the bytes of `location` that may not appear in a header
/// value, leaving URL syntax and existing escapes alone.
fn encode_location(location: &str) -> String {
    use std::fmt::Write;

    let mut encoded = String::with_capacity(location.len());
    for byte in location.bytes() {
        if byte.is_ascii_graphic() {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}
