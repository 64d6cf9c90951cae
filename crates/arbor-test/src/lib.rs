//! # Arbor Test
//!
//! In-memory testing for Arbor applications: requests go through the full
//! dispatch cycle without a server or a socket.
//!
//! ## Example
//!
//! ```ignore
//! use arbor_test::TestClient;
//! use http::StatusCode;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_signup() {
//!     let client = TestClient::new(app());
//!
//!     let response = client
//!         .post("/signup/")
//!         .form(&[("email", "ada@example.com")])
//!         .send()
//!         .await
//!         .unwrap();
//!     response.assert_status(StatusCode::OK);
//!
//!     let response = client.get("/account").send().await.unwrap();
//!     assert_eq!(response.location(), Some("http://localhost/account/"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::TestClient;
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
