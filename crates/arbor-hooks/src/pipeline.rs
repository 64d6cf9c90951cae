//! Hook ordering and execution.

use arbor_core::{DispatchError, DispatchResult, DispatchState, Hook};
use std::fmt;
use std::sync::Arc;

/// A lifecycle phase.
#[derive(Debug, Clone, Copy)]
pub enum HookEvent<'a> {
    /// Before the path is resolved.
    OnRoute,
    /// After resolution, before the handler.
    Before,
    /// On every exit path.
    After,
    /// On failure, with the error.
    OnError(&'a DispatchError),
}

impl HookEvent<'_> {
    /// Returns the phase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OnRoute => "on_route",
            Self::Before => "before",
            Self::After => "after",
            Self::OnError(_) => "on_error",
        }
    }

    /// Returns `true` for the phases that run in descending priority.
    #[must_use]
    pub const fn is_leaving(&self) -> bool {
        matches!(self, Self::After | Self::OnError(_))
    }
}

/// An ordered set of hooks for one dispatch cycle.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn Hook>>,
}

/// Merges controller hooks with application hooks.
///
/// Controller hooks (node hooks, then handler hooks) are placed before the
/// application hooks, then the list is sorted by ascending priority. The
/// sort is stable, so equal priorities keep that input order.
#[must_use]
pub fn compute_hooks(app: &[Arc<dyn Hook>], controller: &[Arc<dyn Hook>]) -> HookPipeline {
    let mut hooks: Vec<Arc<dyn Hook>> = controller.iter().chain(app).cloned().collect();
    hooks.sort_by_key(|hook| hook.priority());
    HookPipeline { hooks }
}

impl HookPipeline {
    /// Returns the hooks in entering order.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if there are no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs one phase.
    ///
    /// `OnRoute` and `Before` run in ascending priority; `After` and
    /// `OnError` run the same list in reverse. The first failing hook stops
    /// the phase and its error is returned.
    pub fn run(&self, event: HookEvent<'_>, state: &mut DispatchState) -> DispatchResult<()> {
        if event.is_leaving() {
            self.hooks
                .iter()
                .rev()
                .try_for_each(|hook| invoke(hook.as_ref(), event, state))
        } else {
            self.hooks
                .iter()
                .try_for_each(|hook| invoke(hook.as_ref(), event, state))
        }
    }
}

fn invoke(hook: &dyn Hook, event: HookEvent<'_>, state: &mut DispatchState) -> DispatchResult<()> {
    tracing::trace!(hook = hook.name(), phase = event.name(), "running hook");
    let result = match event {
        HookEvent::OnRoute => hook.on_route(state),
        HookEvent::Before => hook.before(state),
        HookEvent::After => hook.after(state),
        HookEvent::OnError(error) => hook.on_error(state, error),
    };
    if let Err(ref err) = result {
        tracing::debug!(hook = hook.name(), phase = event.name(), error = %err, "hook failed");
    }
    result
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| (h.name(), h.priority())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{abort, Request, RequestContext};
    use http::{Method, StatusCode};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: String,
        priority: i32,
        log: Log,
        fail_before: bool,
    }

    impl Recorder {
        fn new(name: &str, priority: i32, log: &Log) -> Arc<dyn Hook> {
            Arc::new(Self {
                name: name.to_string(),
                priority,
                log: Arc::clone(log),
                fail_before: false,
            })
        }

        fn failing(name: &str, priority: i32, log: &Log) -> Arc<dyn Hook> {
            Arc::new(Self {
                name: name.to_string(),
                priority,
                log: Arc::clone(log),
                fail_before: true,
            })
        }

        fn record(&self, phase: &str) {
            self.log.lock().push(format!("{phase}:{}", self.name));
        }
    }

    impl Hook for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn on_route(&self, _state: &mut DispatchState) -> DispatchResult<()> {
            self.record("on_route");
            Ok(())
        }

        fn before(&self, _state: &mut DispatchState) -> DispatchResult<()> {
            self.record("before");
            if self.fail_before {
                return Err(abort(StatusCode::FORBIDDEN));
            }
            Ok(())
        }

        fn after(&self, _state: &mut DispatchState) -> DispatchResult<()> {
            self.record("after");
            Ok(())
        }

        fn on_error(&self, _state: &mut DispatchState, error: &DispatchError) -> DispatchResult<()> {
            self.record(&format!("on_error({})", error.status_code().map_or(0, |s| s.as_u16())));
            Ok(())
        }
    }

    fn state() -> DispatchState {
        DispatchState::new(Request::new(Method::GET, "/"), RequestContext::new())
    }

    fn names(pipeline: &HookPipeline) -> Vec<&str> {
        pipeline.hooks().iter().map(|h| h.name()).collect()
    }

    #[test]
    fn test_priority_order_entering_and_leaving() {
        let log = Log::default();
        let app = vec![Recorder::new("p20", 20, &log), Recorder::new("p10", 10, &log)];
        let controller = vec![Recorder::new("p15", 15, &log)];
        let pipeline = compute_hooks(&app, &controller);
        let mut state = state();

        pipeline.run(HookEvent::Before, &mut state).unwrap();
        pipeline.run(HookEvent::After, &mut state).unwrap();

        assert_eq!(
            *log.lock(),
            [
                "before:p10",
                "before:p15",
                "before:p20",
                "after:p20",
                "after:p15",
                "after:p10"
            ]
        );
    }

    #[test]
    fn test_ties_put_controller_hooks_first() {
        let log = Log::default();
        let app = vec![Recorder::new("app", 100, &log)];
        let controller = vec![Recorder::new("node", 100, &log), Recorder::new("handler", 100, &log)];
        let pipeline = compute_hooks(&app, &controller);
        assert_eq!(names(&pipeline), ["node", "handler", "app"]);
    }

    #[test]
    fn test_failure_stops_phase() {
        let log = Log::default();
        let app = vec![
            Recorder::failing("guard", 1, &log),
            Recorder::new("later", 2, &log),
        ];
        let pipeline = compute_hooks(&app, &[]);
        let err = pipeline.run(HookEvent::Before, &mut state()).unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::FORBIDDEN));
        assert_eq!(*log.lock(), ["before:guard"]);
    }

    #[test]
    fn test_on_error_receives_error_in_reverse() {
        let log = Log::default();
        let app = vec![Recorder::new("a", 1, &log), Recorder::new("b", 2, &log)];
        let pipeline = compute_hooks(&app, &[]);
        let error = abort(StatusCode::NOT_FOUND);
        pipeline
            .run(HookEvent::OnError(&error), &mut state())
            .unwrap();
        assert_eq!(*log.lock(), ["on_error(404):b", "on_error(404):a"]);
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = compute_hooks(&[], &[]);
        assert!(pipeline.is_empty());
        assert!(pipeline.run(HookEvent::OnRoute, &mut state()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_sorted_and_stable(priorities in prop::collection::vec(-5i32..5, 0..12)) {
            let log = Log::default();
            let app: Vec<_> = priorities
                .iter()
                .enumerate()
                .map(|(i, p)| Recorder::new(&i.to_string(), *p, &log))
                .collect();
            let pipeline = compute_hooks(&app, &[]);
            for pair in pipeline.hooks().windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.priority() <= b.priority());
                if a.priority() == b.priority() {
                    let ia: usize = a.name().parse().unwrap();
                    let ib: usize = b.name().parse().unwrap();
                    prop_assert!(ia < ib);
                }
            }
            prop_assert_eq!(pipeline.len(), priorities.len());
        }
    }
}
