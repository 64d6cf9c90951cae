//! Test client for in-memory dispatch.

use crate::request::TestRequestBuilder;
use arbor_dispatch::Application;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;

/// A client that dispatches requests straight into an [`Application`].
///
/// No sockets are involved: every request runs the full dispatch cycle
/// (hooks, routing, validation, rendering) in the calling task.
///
/// # Example
///
/// ```
/// use arbor_core::{Handler, Reply};
/// use arbor_dispatch::Application;
/// use arbor_router::HandlerNode;
/// use arbor_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let root = HandlerNode::new("root")
///     .with_index(Handler::new("index", |_| async { Ok(Reply::text("hello")) }));
/// let client = TestClient::new(Application::builder(root).build().unwrap());
///
/// let response = client.get("/").send().await.unwrap();
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.text().unwrap(), "hello");
/// # });
/// ```
#[derive(Clone)]
#[must_use]
pub struct TestClient {
    app: Arc<Application>,
    default_headers: HeaderMap,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: impl Into<Arc<Application>>) -> Self {
        Self {
            app: app.into(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Returns the application under test.
    #[must_use]
    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    pub(crate) const fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        TestRequestBuilder::new(self, method, uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestError;
    use arbor_core::{DispatchError, Handler, Reply, Signature};
    use arbor_router::HandlerNode;
    use http::StatusCode;
    use serde_json::json;

    fn client() -> TestClient {
        let echo = Handler::new("echo", |inv| async move {
            let request = inv.request();
            Ok(Reply::data(json!({
                "method": request.method().as_str(),
                "host": request.header("host"),
                "custom": request.header("x-custom"),
                "kwargs": inv.kwargs(),
            })))
        })
        .signature(Signature::new().varkw())
        .json();
        let fail = Handler::new("fail", |_| async {
            Err(DispatchError::upstream_message("boom"))
        });
        let root = HandlerNode::new("root")
            .with_handler("echo", echo)
            .with_handler("fail", fail);
        TestClient::new(Application::builder(root).build().unwrap())
    }

    #[tokio::test]
    async fn test_all_methods() {
        let client = client();
        for (builder, method) in [
            (client.get("/echo"), "GET"),
            (client.put("/echo"), "PUT"),
            (client.delete("/echo"), "DELETE"),
            (client.request(Method::PATCH, "/echo"), "PATCH"),
        ] {
            let value: serde_json::Value = builder.send().await.unwrap().json().unwrap();
            assert_eq!(value["method"], method);
        }
    }

    #[tokio::test]
    async fn test_default_host_and_headers() {
        let client = client().with_default_header(
            HeaderName::from_static("x-custom"),
            HeaderValue::from_static("default-value"),
        );
        let value: serde_json::Value = client.get("/echo").send().await.unwrap().json().unwrap();
        assert_eq!(value["host"], "localhost");
        assert_eq!(value["custom"], "default-value");
    }

    #[tokio::test]
    async fn test_form_body() {
        let value: serde_json::Value = client()
            .post("/echo")
            .form(&[("name", "ada"), ("lang", "en")])
            .send()
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(value["kwargs"], json!({"name": "ada", "lang": "en"}));
    }

    #[tokio::test]
    async fn test_status_errors_are_responses() {
        let response = client().get("/missing").send().await.unwrap();
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_errors_surface() {
        let err = client().get("/fail").send().await.unwrap_err();
        assert!(matches!(err, TestError::Dispatch(DispatchError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_invalid_header_is_reported_on_send() {
        let err = client()
            .get("/echo")
            .header("bad header", "x")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }
}
