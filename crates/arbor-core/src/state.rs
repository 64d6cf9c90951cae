//! Shared mutable state of one dispatch cycle.

use crate::context::RequestContext;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;

/// The state hooks operate on.
///
/// Owned by exactly one dispatch cycle and dropped when the cycle ends.
#[derive(Debug)]
pub struct DispatchState {
    request: Request,
    response: Response,
    context: RequestContext,
    handler: Option<Arc<Handler>>,
}

impl DispatchState {
    /// Creates the state for a request.
    #[must_use]
    pub fn new(request: Request, context: RequestContext) -> Self {
        Self {
            request,
            response: Response::new(),
            context,
            handler: None,
        }
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request for modification.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the response.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the response for modification.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replaces the response.
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    /// Returns the request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Returns the request context for modification.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    /// Returns the resolved handler, once routing has finished.
    #[must_use]
    pub const fn handler(&self) -> Option<&Arc<Handler>> {
        self.handler.as_ref()
    }

    /// Records the resolved handler.
    pub fn set_handler(&mut self, handler: Arc<Handler>) {
        self.handler = Some(handler);
    }

    /// Consumes the state, returning the request, response and context.
    #[must_use]
    pub fn into_parts(self) -> (Request, Response, RequestContext) {
        (self.request, self.response, self.context)
    }
}
