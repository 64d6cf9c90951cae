//! # Arbor Core
//!
//! Core types and traits for the Arbor request-dispatch framework.
//!
//! This crate provides the foundational types used throughout Arbor:
//!
//! - [`RequestContext`] - Per-request state bag shared by resolver, hooks and handlers
//! - [`RequestId`] - UUID v7 request identifier
//! - [`DispatchError`] - Error taxonomy, plus the [`abort`] and [`redirect`] primitives
//! - [`Handler`] - A callable with its [`Signature`], [`Exposure`] and metadata
//! - [`Hook`] - Lifecycle hook contract
//! - [`DispatchState`] - The request, response and context hooks operate on
//! - [`Schema`] / [`Validation`] - Validation seam declared on handlers

#![doc(html_root_url = "https://docs.rs/arbor-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod guard;
mod handler;
mod hook;
mod request;
mod response;
mod state;
mod validation;

pub use context::{RequestContext, RequestId};
pub use error::{
    abort, abort_with_detail, redirect, DispatchError, DispatchResult, ErrorCategory, FieldErrors,
    Forward,
};
pub use guard::Guard;
pub use handler::{
    Arguments, BoxFuture, Exposure, Handler, HandlerFn, HandlerKind, Invocation, MethodTable,
    Output, Reply, Signature, APPLICATION_JSON, JSON_TEMPLATE, TEXT_HTML,
};
pub use hook::{Hook, DEFAULT_PRIORITY};
pub use request::{ParamPrecedence, Params, Request, X_FORWARDED_PROTO};
pub use response::{Body, Response};
pub use state::DispatchState;
pub use validation::{DecodeOptions, ErrorHandler, Schema, Validation, DEFAULT_MAX_DECODE_DEPTH};
