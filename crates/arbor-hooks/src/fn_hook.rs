//! Closure-built hooks.

use arbor_core::{DispatchError, DispatchResult, DispatchState, Hook, DEFAULT_PRIORITY};
use std::fmt;
use std::sync::Arc;

type PhaseFn = Arc<dyn Fn(&mut DispatchState) -> DispatchResult<()> + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&mut DispatchState, &DispatchError) -> DispatchResult<()> + Send + Sync>;

/// A hook assembled from closures.
///
/// Phases without a closure are no-ops.
///
/// # Example
///
/// ```
/// use arbor_core::{DispatchState, Hook};
/// use arbor_hooks::FnHook;
///
/// let hook = FnHook::new("audit")
///     .priority(5)
///     .after(|state: &mut DispatchState| {
///         tracing::info!(path = %state.request().path(), "audited");
///         Ok(())
///     });
///
/// assert_eq!(hook.name(), "audit");
/// assert_eq!(Hook::priority(&hook), 5);
/// ```
#[derive(Clone)]
pub struct FnHook {
    name: String,
    priority: i32,
    on_route: Option<PhaseFn>,
    before: Option<PhaseFn>,
    after: Option<PhaseFn>,
    on_error: Option<ErrorFn>,
}

impl FnHook {
    /// Creates a hook with the default priority and no callbacks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            on_route: None,
            before: None,
            after: None,
            on_error: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the `on_route` callback.
    #[must_use]
    pub fn on_route<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut DispatchState) -> DispatchResult<()> + Send + Sync + 'static,
    {
        self.on_route = Some(Arc::new(f));
        self
    }

    /// Sets the `before` callback.
    #[must_use]
    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut DispatchState) -> DispatchResult<()> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    /// Sets the `after` callback.
    #[must_use]
    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut DispatchState) -> DispatchResult<()> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }

    /// Sets the `on_error` callback.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut DispatchState, &DispatchError) -> DispatchResult<()> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

fn call(phase: Option<&PhaseFn>, state: &mut DispatchState) -> DispatchResult<()> {
    phase.map_or(Ok(()), |f| f(state))
}

impl Hook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn on_route(&self, state: &mut DispatchState) -> DispatchResult<()> {
        call(self.on_route.as_ref(), state)
    }

    fn before(&self, state: &mut DispatchState) -> DispatchResult<()> {
        call(self.before.as_ref(), state)
    }

    fn after(&self, state: &mut DispatchState) -> DispatchResult<()> {
        call(self.after.as_ref(), state)
    }

    fn on_error(&self, state: &mut DispatchState, error: &DispatchError) -> DispatchResult<()> {
        self.on_error.as_ref().map_or(Ok(()), |f| f(state, error))
    }
}

impl fmt::Debug for FnHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("on_route", &self.on_route.is_some())
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
