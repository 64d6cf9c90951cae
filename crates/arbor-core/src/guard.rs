//! Access guards for secured subtrees.

use crate::context::RequestContext;
use crate::request::Request;
use std::fmt;
use std::sync::Arc;

/// A permission check attached to a node or handler.
///
/// Guards accumulate while the resolver descends; an unlocked child edge
/// clears the guards collected above it. A guard returning `false` fails
/// the request with `401 Unauthorized`.
///
/// # Example
///
/// ```
/// use arbor_core::{Guard, Request, RequestContext};
/// use http::Method;
///
/// let guard = Guard::new(|req: &Request, _ctx: &RequestContext| {
///     req.header("authorization").is_some()
/// });
///
/// let request = Request::new(Method::GET, "/admin/");
/// assert!(!guard.check(&request, &RequestContext::new()));
/// ```
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn(&Request, &RequestContext) -> bool + Send + Sync>);

impl Guard {
    /// Creates a guard from a predicate.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Request, &RequestContext) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    /// Runs the check.
    #[must_use]
    pub fn check(&self, request: &Request, ctx: &RequestContext) -> bool {
        (self.0)(request, ctx)
    }

    /// Returns `true` if both guards are the same registration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
