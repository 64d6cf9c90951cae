//! Lifecycle hook pipeline for Arbor.
//!
//! The effective hooks of a request are computed once the handler is
//! known: hooks declared on the crossed nodes and on the handler come
//! first, application hooks after them, and the whole list is stably
//! sorted by priority.
//!
//! ```text
//!   on_route / before        after / on_error
//!   ─────────────────►       ◄─────────────────
//!   10 ──► 15 ──► 20          10 ◄── 15 ◄── 20
//! ```
//!
//! ## Provided hooks
//!
//! - [`FnHook`] - closure-built hook for one-off behaviour
//! - [`stages::RequestLogHook`] - logs every dispatch outcome
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{DispatchState, Request, RequestContext};
//! use arbor_hooks::{compute_hooks, FnHook, HookEvent};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let app_hooks = vec![Arc::new(
//!     FnHook::new("stamp").before(|state: &mut DispatchState| {
//!         state.context_mut().set_override_content_type("text/plain");
//!         Ok(())
//!     }),
//! ) as Arc<dyn arbor_core::Hook>];
//!
//! let pipeline = compute_hooks(&app_hooks, &[]);
//! let mut state = DispatchState::new(Request::new(Method::GET, "/"), RequestContext::new());
//! pipeline.run(HookEvent::Before, &mut state).unwrap();
//! assert_eq!(state.context().override_content_type(), Some("text/plain"));
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-hooks/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod fn_hook;
mod pipeline;
pub mod stages;

pub use fn_hook::FnHook;
pub use pipeline::{compute_hooks, HookEvent, HookPipeline};
