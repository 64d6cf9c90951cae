//! Request logging hook.
//!
//! Emits one structured `tracing` event per dispatch cycle, on the way out,
//! with the request ID, method, path, resolved handler, status and elapsed
//! time. It has the lowest possible priority, so it is the last `after`
//! hook to run and sees the final response.

use arbor_core::{DispatchError, DispatchResult, DispatchState, Hook};

/// Hook that logs every dispatch outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogHook;

impl RequestLogHook {
    /// Creates the hook.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Hook for RequestLogHook {
    fn name(&self) -> &str {
        "request_log"
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn after(&self, state: &mut DispatchState) -> DispatchResult<()> {
        let ctx = state.context();
        tracing::info!(
            request_id = %ctx.request_id(),
            method = %state.request().method(),
            path = %state.request().path(),
            handler = state.handler().map_or("-", |h| h.name()),
            status = state.response().status().as_u16(),
            elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            "request dispatched"
        );
        Ok(())
    }

    fn on_error(&self, state: &mut DispatchState, error: &DispatchError) -> DispatchResult<()> {
        if error.is_status() {
            tracing::debug!(
                request_id = %state.context().request_id(),
                error = %error,
                "request ended with status"
            );
        } else {
            tracing::error!(
                request_id = %state.context().request_id(),
                category = ?error.category(),
                error = %error,
                "request failed"
            );
        }
        Ok(())
    }
}
