//! # Arbor
//!
//! **Object-dispatch request routing for async Rust**
//!
//! Arbor maps a request path onto a tree of handler nodes, one segment at a
//! time, then drives the matched handler through a fixed lifecycle:
//!
//! - **Path resolution** over named children, index handlers, lookups,
//!   route overrides and default handlers
//! - **Argument binding** of the unconsumed remainder and merged request
//!   parameters onto a declared signature
//! - **Hooks** at application, subtree and handler level, ordered by
//!   priority
//! - **Validation** with internal forwards to an error handler and form
//!   refill
//! - **Rendering** through pluggable template engines
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor::prelude::*;
//!
//! # tokio_test_block_on(async {
//! let users = HandlerNode::new("users")
//!     .with_index(Handler::new("list_users", |_| async { Ok(Reply::text("all users")) }))
//!     .with_default(
//!         Handler::new("show_user", |inv: Invocation| async move {
//!             Ok(Reply::text(format!("user {}", inv.arg_str("id").unwrap_or("?"))))
//!         })
//!         .signature(Signature::new().param("id")),
//!     );
//! let root = HandlerNode::new("root").with_child("users", users);
//!
//! let app = Application::builder(root).build()?;
//! let response = app.dispatch(Request::new(http::Method::GET, "/users/42")).await?;
//! assert_eq!(response.body().as_text(), Some("user 42"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → on_route → resolve → content type → guards → before
//!                                                          ↓
//!        validation → bind → handler → render → refill → Response
//!                                                          ↓
//!                                       after (reversed) / on_error
//! ```

#![doc(html_root_url = "https://docs.rs/arbor/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Request, response, handler and error types
pub use arbor_core as core;

// Handler tree and path resolution
pub use arbor_router as router;

// Parameter merging, decoding and argument binding
pub use arbor_extract as extract;

// Hook ordering and execution
pub use arbor_hooks as hooks;

// The dispatcher
pub use arbor_dispatch as dispatch;

// Configuration loading
pub use arbor_config as config;

// Logging and metrics
pub use arbor_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use arbor::prelude::*;
/// ```
pub mod prelude {
    pub use arbor_core::{
        abort, abort_with_detail, redirect, DecodeOptions, DispatchError, DispatchResult,
        DispatchState, FieldErrors, Guard, Handler, Hook, Invocation, Params, Reply, Request,
        RequestContext, Response, Signature, Validation,
    };

    pub use arbor_router::{HandlerNode, Target};

    pub use arbor_hooks::FnHook;

    pub use arbor_dispatch::{
        Application, ApplicationBuilder, FormFiller, RenderError, RenderRequest, Renderer,
    };

    pub use arbor_config::{ArborConfig, ConfigLoader};
}
