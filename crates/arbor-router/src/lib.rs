//! Object-tree path resolution for Arbor.
//!
//! Applications are organised as a tree of [`HandlerNode`]s. A request path
//! is split into segments and walked from the root; each segment either
//! names a child, addresses an index handler, or is handed to one of the
//! node's fallbacks (route override, lookup, default handler).
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{Handler, Reply, RequestContext};
//! use arbor_router::{resolve, split_path, HandlerNode};
//! use std::sync::Arc;
//!
//! let hello = Handler::new("hello", |_| async { Ok(Reply::text("hi")) });
//! let catch_all = Handler::new("catch_all", |_| async { Ok(Reply::text("?")) });
//!
//! let root = Arc::new(
//!     HandlerNode::new("root")
//!         .with_handler("hello", hello)
//!         .with_default(catch_all),
//! );
//!
//! let mut ctx = RequestContext::new();
//! let found = resolve(&root, &split_path("/hello/world"), &mut ctx).unwrap();
//! assert_eq!(found.handler().name(), "hello");
//! assert_eq!(found.remainder(), ["world"]);
//!
//! let fallback = resolve(&root, &split_path("/elsewhere/x"), &mut ctx).unwrap();
//! assert_eq!(fallback.handler().name(), "catch_all");
//! assert_eq!(fallback.remainder(), ["elsewhere", "x"]);
//! ```
//!
//! # Resolution order
//!
//! ```text
//!   segment ──► child? ──► index alias? ──► route override? ──► lookup? ──► default?
//!                 │                                               │
//!                 └── subtree missed ─────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod node;
mod resolver;

pub use node::{Child, HandlerNode, Lookup, LookupFn, RouteFn, Target, INDEX_SEGMENT};
pub use resolver::{resolve, split_path, ResolutionResult};
