//! # Arbor Dispatch
//!
//! The dispatcher: turns a [`Request`](arbor_core::Request) into a
//! [`Response`](arbor_core::Response) by walking an [`Application`]'s
//! handler tree.
//!
//! ## Lifecycle
//!
//! ```text
//! Request
//!    │
//!    ▼
//! on_route hooks ─► extension negotiation ─► resolve ─► canonical policy
//!    │
//!    ▼
//! method variant ─► content type ─► guards ─► before hooks
//!    │
//!    ▼
//! validation ─► argument binding ─► handler ─► template ─► form refill
//!    │
//!    ▼
//! after hooks (always) ─► Response
//! ```
//!
//! Failures run the on-error hooks. `NotFound`, aborts and redirects become
//! the response; configuration, invocation and upstream errors are returned
//! to the caller. An internal forward replays the request from the top.
//!
//! ## Example
//!
//! ```
//! use arbor_core::{Handler, Reply, Request};
//! use arbor_dispatch::Application;
//! use arbor_router::HandlerNode;
//! use http::Method;
//! use serde_json::json;
//!
//! let root = HandlerNode::new("root").with_handler(
//!     "status",
//!     Handler::new("status", |_| async { Ok(Reply::data(json!({"ok": true}))) }).json(),
//! );
//! let app = Application::builder(root).build().unwrap();
//!
//! # tokio_test::block_on(async {
//! let response = app.dispatch(Request::new(Method::GET, "/status")).await.unwrap();
//! assert_eq!(response.content_type(), Some("application/json"));
//! assert_eq!(response.body().as_text(), Some(r#"{"ok":true}"#));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-dispatch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod canonical;
mod dispatcher;
pub mod negotiation;
mod render;
mod validation;

pub use app::{Application, ApplicationBuilder};
pub use render::{
    FormFiller, RenderError, RenderRequest, Renderer, RendererRegistry, TemplateHelpers,
};
