//! Argument binding for Arbor handlers.
//!
//! Once a path resolves, three things turn the request into handler
//! arguments:
//!
//! - [`merge_params`] flattens the query string and an url-encoded form
//!   body into one ordered [`Params`](arbor_core::Params) map.
//! - [`variable_decode`] optionally rebuilds nested objects and lists from
//!   flat keys such as `address.city` or `tags-0`, for validation.
//! - [`bind`] maps the unconsumed path remainder and the params onto the
//!   handler's [`Signature`](arbor_core::Signature).
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{ParamPrecedence, Request, RequestContext, Signature};
//! use arbor_extract::{bind, merge_params};
//! use http::Method;
//! use serde_json::json;
//!
//! let request = Request::new(Method::GET, "/books/42?format=short");
//! let params = merge_params(&request, ParamPrecedence::default()).unwrap();
//!
//! let signature = Signature::new().param("id").optional("format", json!("long"));
//! let args = bind(&signature, &["42".to_string()], params, &mut RequestContext::new()).unwrap();
//!
//! assert_eq!(args.positional(), [json!("42"), json!("short")]);
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod decode;
mod params;

pub use binder::bind;
pub use decode::variable_decode;
pub use params::merge_params;
