//! The hook trait.
//!
//! Hooks observe and steer the dispatch lifecycle. Each hook has a priority
//! and four optional callbacks:
//!
//! | Phase | When | Order |
//! |---|---|---|
//! | `on_route` | before the path is resolved | ascending priority |
//! | `before` | after resolution, before the handler | ascending priority |
//! | `after` | on every exit path | descending priority |
//! | `on_error` | on any failure except an internal forward | descending priority |
//!
//! Ordering and execution live in the `arbor-hooks` crate; this module only
//! defines the contract so handlers and nodes can declare hooks.

use crate::error::{DispatchError, DispatchResult};
use crate::state::DispatchState;

/// Priority of a hook that does not declare one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A lifecycle hook.
///
/// All callbacks default to no-ops. A callback that returns an error stops
/// its phase; the error propagates to the dispatcher.
///
/// # Invariants
///
/// - Hooks are immutable once registered; per-request data belongs in the
///   [`RequestContext`](crate::RequestContext) extensions.
/// - Lower priorities run first on the way in and last on the way out.
///
/// # Example
///
/// ```
/// use arbor_core::{DispatchResult, DispatchState, Hook};
///
/// struct PoweredBy;
///
/// impl Hook for PoweredBy {
///     fn name(&self) -> &str {
///         "powered-by"
///     }
///
///     fn after(&self, state: &mut DispatchState) -> DispatchResult<()> {
///         state
///             .response_mut()
///             .headers_mut()
///             .insert("x-powered-by", http::HeaderValue::from_static("arbor"));
///         Ok(())
///     }
/// }
/// ```
pub trait Hook: Send + Sync + 'static {
    /// Returns the name of this hook, used in logs.
    fn name(&self) -> &str;

    /// Returns the priority of this hook.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Runs before the path is resolved.
    fn on_route(&self, _state: &mut DispatchState) -> DispatchResult<()> {
        Ok(())
    }

    /// Runs after resolution, before parameters are validated and bound.
    fn before(&self, _state: &mut DispatchState) -> DispatchResult<()> {
        Ok(())
    }

    /// Runs when the dispatch cycle ends, whatever its outcome.
    fn after(&self, _state: &mut DispatchState) -> DispatchResult<()> {
        Ok(())
    }

    /// Runs when the dispatch cycle fails.
    fn on_error(&self, _state: &mut DispatchState, _error: &DispatchError) -> DispatchResult<()> {
        Ok(())
    }
}
