//! Test request building.

use crate::client::TestClient;
use crate::error::TestError;
use crate::response::TestResponse;
use arbor_core::Request;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

/// Builder for a request sent through a [`TestClient`].
///
/// Builder errors (invalid header names, unencodable bodies) are kept and
/// reported by [`send`](Self::send), so calls can be chained freely.
#[must_use]
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl<'a> TestRequestBuilder<'a> {
    pub(crate) fn new(client: &'a TestClient, method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            client,
            method,
            uri: uri.as_ref().to_string(),
            headers: client.default_headers().clone(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Sets a header on the request.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let response = client
    ///     .get("/admin/")
    ///     .header("Authorization", "Basic YWRtaW46c2VjcmV0")
    ///     .send()
    ///     .await?;
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let parsed = HeaderName::try_from(name.as_ref())
            .map_err(|e| TestError::RequestBuild(format!("invalid header name: {e}")))
            .and_then(|name| {
                HeaderValue::try_from(value.as_ref())
                    .map(|value| (name, value))
                    .map_err(|e| TestError::RequestBuild(format!("invalid header value: {e}")))
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    /// Sets the request body as form-urlencoded.
    ///
    /// This also sets the `Content-Type` header to
    /// `application/x-www-form-urlencoded`.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => self.body = Bytes::from(encoded),
            Err(e) => self.fail(TestError::RequestBuild(format!("form encoding failed: {e}"))),
        }
        self.header(
            header::CONTENT_TYPE.as_str(),
            "application/x-www-form-urlencoded",
        )
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }

    /// Builds the request without sending it.
    ///
    /// A `Host: localhost` header is added unless one was set.
    pub fn build(self) -> Result<Request, TestError> {
        self.into_parts().map(|(_, request)| request)
    }

    fn into_parts(mut self) -> Result<(&'a TestClient, Request), TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.uri.is_empty() && !self.uri.starts_with('/') {
            return Err(TestError::RequestBuild(format!(
                "request target must be an absolute path, got {:?}",
                self.uri
            )));
        }
        if !self.headers.contains_key(header::HOST) {
            self.headers
                .insert(header::HOST, HeaderValue::from_static("localhost"));
        }

        let mut request = Request::new(self.method, &self.uri).with_body(self.body);
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        Ok((self.client, request))
    }

    /// Dispatches the request.
    ///
    /// Status-bearing outcomes (404s, aborts, redirects) are responses;
    /// every other dispatch failure is returned as [`TestError::Dispatch`].
    pub async fn send(self) -> Result<TestResponse, TestError> {
        let (client, request) = self.into_parts()?;
        let response = client.application().dispatch(request).await?;
        Ok(response.into())
    }
}
