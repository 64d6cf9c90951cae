//! Path resolution.
//!
//! [`resolve`] walks a [`HandlerNode`] tree depth-first, one segment at a
//! time. At each node the first applicable rule wins:
//!
//! 1. The path ended: the index handler, flagged non-canonical because the
//!    path names a container without its trailing slash.
//! 2. The next segment is empty (a trailing slash): the index handler.
//! 3. The segment names a child: descend into it. `index` names the index
//!    handler unless a child claims that name.
//! 4. No child matched and the node has a route override: it resolves the
//!    rest of the path.
//! 5. The node has a lookup: it builds the next node from the segment.
//! 6. The node has a default handler: it takes the whole remainder.
//!
//! When a child subtree comes up empty, or a lookup declines the segment
//! with `NotFound`, the node's lookup and default still get their chance, so
//! the deepest salvage point wins. Once a lookup returns a node, that node
//! owns the rest of the path and a miss below it is a plain 404.

use crate::node::{HandlerNode, Lookup, Target, INDEX_SEGMENT};
use arbor_core::{DispatchError, DispatchResult, Guard, Handler, Hook, RequestContext};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// The outcome of resolving a path.
#[derive(Clone)]
pub struct ResolutionResult {
    handler: Arc<Handler>,
    remainder: Vec<String>,
    is_canonical: bool,
    hooks: Vec<Arc<dyn Hook>>,
    guards: Vec<Guard>,
}

impl ResolutionResult {
    /// Returns the resolved handler.
    #[must_use]
    pub const fn handler(&self) -> &Arc<Handler> {
        &self.handler
    }

    /// Returns the segments not consumed by traversal.
    #[must_use]
    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }

    /// Returns `false` if the path lacks the trailing slash its handler
    /// expects.
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.is_canonical
    }

    /// Returns the hooks declared on the nodes crossed, outermost first.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the guards still in force for the handler.
    #[must_use]
    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }
}

impl PartialEq for ResolutionResult {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
            && self.remainder == other.remainder
            && self.is_canonical == other.is_canonical
            && self.hooks.len() == other.hooks.len()
            && self
                .hooks
                .iter()
                .zip(&other.hooks)
                .all(|(a, b)| Arc::ptr_eq(a, b))
            && self.guards.len() == other.guards.len()
            && self
                .guards
                .iter()
                .zip(&other.guards)
                .all(|(a, b)| a.ptr_eq(b))
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("handler", &self.handler.name())
            .field("remainder", &self.remainder)
            .field("is_canonical", &self.is_canonical)
            .field("hooks", &self.hooks.len())
            .field("guards", &self.guards.len())
            .finish()
    }
}

/// Splits a path into segments, dropping everything before the first `/`.
///
/// ```
/// use arbor_router::split_path;
///
/// assert_eq!(split_path("/"), vec![""]);
/// assert!(split_path("").is_empty());
/// assert_eq!(split_path("/sub/"), vec!["sub", ""]);
/// ```
#[must_use]
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/').skip(1).map(ToString::to_string).collect()
}

/// Resolves `path` against the tree rooted at `root`.
///
/// Lookups and route overrides may read and write `ctx`; apart from that
/// resolution has no side effects.
///
/// # Errors
///
/// - [`DispatchError::NotFound`] when no handler can be reached.
/// - [`DispatchError::Configuration`] when a lookup does not accept a
///   variadic remainder.
/// - Any error raised by a lookup or route override.
///
/// # Example
///
/// ```
/// use arbor_core::{Handler, Reply, RequestContext};
/// use arbor_router::{resolve, split_path, HandlerNode};
/// use std::sync::Arc;
///
/// let deeper = Handler::new("deeper", |_| async { Ok(Reply::text("deeper")) });
/// let root = Arc::new(HandlerNode::new("root").with_child(
///     "sub",
///     HandlerNode::new("sub").with_child("sub", HandlerNode::new("sub").with_handler("deeper", deeper)),
/// ));
///
/// let mut ctx = RequestContext::new();
/// let result = resolve(&root, &split_path("/sub/sub/deeper"), &mut ctx).unwrap();
/// assert_eq!(result.handler().name(), "deeper");
/// assert!(result.remainder().is_empty());
/// ```
pub fn resolve(
    root: &Arc<HandlerNode>,
    path: &[String],
    ctx: &mut RequestContext,
) -> DispatchResult<ResolutionResult> {
    let trail = Trail::default().enter(root, false);
    match descend(root, &trail, path, ctx)? {
        Walk::Found(result) => Ok(result),
        Walk::Settled(err) => Err(err),
    }
}

/// Hooks and guards collected on the way down.
#[derive(Clone, Default)]
struct Trail {
    hooks: SmallVec<[Arc<dyn Hook>; 4]>,
    guards: SmallVec<[Guard; 2]>,
}

impl Trail {
    fn enter(&self, node: &HandlerNode, unlocked: bool) -> Self {
        let mut next = self.clone();
        if unlocked {
            next.guards.clear();
        }
        next.hooks.extend(node.hooks().iter().cloned());
        if let Some(guard) = node.guard() {
            next.guards.push(guard.clone());
        }
        next
    }

    fn finish(
        &self,
        handler: &Arc<Handler>,
        remainder: Vec<String>,
        is_canonical: bool,
        unlocked: bool,
    ) -> ResolutionResult {
        let mut guards = if unlocked {
            SmallVec::new()
        } else {
            self.guards.clone()
        };
        if let Some(guard) = handler.guard_ref() {
            guards.push(guard.clone());
        }
        ResolutionResult {
            handler: Arc::clone(handler),
            remainder,
            is_canonical,
            hooks: self.hooks.to_vec(),
            guards: guards.into_vec(),
        }
    }
}

/// How a subtree walk ended.
enum Walk {
    Found(ResolutionResult),
    /// A lookup took over routing and its subtree missed. Ancestors do not
    /// salvage this.
    Settled(DispatchError),
}

fn descend(
    node: &HandlerNode,
    trail: &Trail,
    path: &[String],
    ctx: &mut RequestContext,
) -> DispatchResult<Walk> {
    let Some((first, rest)) = path.split_first() else {
        if let Some(index) = node.index() {
            return Ok(Walk::Found(trail.finish(index, Vec::new(), false, false)));
        }
        return salvage(node, trail, path, ctx);
    };

    if first.is_empty() {
        if let Some(index) = node.index() {
            return Ok(Walk::Found(trail.finish(index, rest.to_vec(), true, false)));
        }
    }

    let matched = match node.child(first) {
        Some(child) => Some(match child.target() {
            Target::Handler(handler) => Ok(Walk::Found(trail.finish(
                handler,
                rest.to_vec(),
                true,
                child.is_unlocked(),
            ))),
            Target::Node(next) => descend(next, &trail.enter(next, child.is_unlocked()), rest, ctx),
        }),
        None if first == INDEX_SEGMENT => node
            .index()
            .map(|index| Ok(Walk::Found(trail.finish(index, rest.to_vec(), true, false)))),
        None => None,
    };

    match matched {
        Some(Err(err)) if err.is_not_found() => {
            tracing::trace!(node = %node.name(), segment = %first, "child subtree missed, salvaging");
        }
        Some(result) => return result,
        None => {
            if let Some(route) = node.route() {
                let (target, remainder) = route(ctx, path)?;
                return match target {
                    Target::Handler(handler) => {
                        Ok(Walk::Found(trail.finish(&handler, remainder, true, false)))
                    }
                    Target::Node(next) => descend(&next, &trail.enter(&next, false), &remainder, ctx),
                };
            }
        }
    }

    salvage(node, trail, path, ctx)
}

/// Tries the node's lookup, then its default handler.
///
/// A lookup that returns a node owns the rest of the path: a miss below it
/// is final.
fn salvage(
    node: &HandlerNode,
    trail: &Trail,
    path: &[String],
    ctx: &mut RequestContext,
) -> DispatchResult<Walk> {
    if let (Some((first, rest)), Some(lookup)) = (path.split_first(), node.lookup()) {
        check_lookup(node, lookup)?;
        match lookup.call(ctx, first, rest) {
            Ok((next, remainder)) => {
                return match descend(&next, &trail.enter(&next, false), &remainder, ctx) {
                    Err(err) if err.is_not_found() => Ok(Walk::Settled(err)),
                    other => other,
                };
            }
            Err(err) if err.is_not_found() => {
                tracing::trace!(node = %node.name(), segment = %first, "lookup missed");
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(default) = node.default_handler() {
        return Ok(Walk::Found(trail.finish(default, path.to_vec(), true, false)));
    }

    Err(DispatchError::not_found(match path.first() {
        Some(segment) => format!("no handler for '{segment}' under '{}'", node.name()),
        None => format!("'{}' has no index handler", node.name()),
    }))
}

fn check_lookup(node: &HandlerNode, lookup: &Lookup) -> DispatchResult<()> {
    let signature = lookup.signature();
    if signature.params().is_empty() || !signature.accepts_varargs() {
        return Err(DispatchError::configuration(format!(
            "lookup on '{}' must accept a segment and a variadic remainder",
            node.name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Reply, RequestContext, Signature};
    use proptest::prelude::*;

    fn page(name: &'static str) -> Handler {
        Handler::new(name, move |_| async move { Ok(Reply::text(name)) })
    }

    fn resolve_path(root: &Arc<HandlerNode>, path: &str) -> DispatchResult<ResolutionResult> {
        resolve(root, &split_path(path), &mut RequestContext::new())
    }

    fn lookup_signature() -> Signature {
        Signature::new().param("segment").varargs()
    }

    fn sample_tree() -> Arc<HandlerNode> {
        let item = |id: &str| {
            HandlerNode::new(format!("item-{id}"))
                .with_index(page("item_index"))
                .with_handler("name", page("item_name"))
        };

        Arc::new(
            HandlerNode::new("root")
                .with_index(page("root_index"))
                .with_handler("about", page("about"))
                .with_child(
                    "sub",
                    HandlerNode::new("sub")
                        .with_index(page("sub_index"))
                        .with_child(
                            "sub",
                            HandlerNode::new("sub").with_handler("deeper", page("deeper")),
                        ),
                )
                .with_child(
                    "items",
                    HandlerNode::new("items").with_lookup(lookup_signature(), move |ctx, id, rest| {
                        if id == "missing" {
                            return Err(DispatchError::not_found("no such item"));
                        }
                        ctx.set_routing_args(vec![id.to_string()]);
                        Ok((Arc::new(item(id)), rest.to_vec()))
                    }),
                )
                .with_child(
                    "files",
                    HandlerNode::new("files").with_default(page("files_default")),
                ),
        )
    }

    #[test]
    fn test_root_index_is_canonical() {
        let root = Arc::new(HandlerNode::new("root").with_index(page("index")));
        let result = resolve_path(&root, "/").unwrap();
        assert_eq!(result.handler().name(), "index");
        assert!(result.remainder().is_empty());
        assert!(result.is_canonical());
    }

    #[test]
    fn test_empty_path_is_noncanonical() {
        let root = sample_tree();
        let result = resolve_path(&root, "").unwrap();
        assert_eq!(result.handler().name(), "root_index");
        assert!(!result.is_canonical());
    }

    #[test]
    fn test_three_level_traversal() {
        let root = sample_tree();
        let result = resolve_path(&root, "/sub/sub/deeper").unwrap();
        assert_eq!(result.handler().name(), "deeper");
        assert!(result.remainder().is_empty());
        assert!(result.is_canonical());
    }

    #[test]
    fn test_container_without_slash_is_noncanonical() {
        let root = sample_tree();
        let result = resolve_path(&root, "/sub").unwrap();
        assert_eq!(result.handler().name(), "sub_index");
        assert!(!result.is_canonical());

        let result = resolve_path(&root, "/sub/").unwrap();
        assert_eq!(result.handler().name(), "sub_index");
        assert!(result.is_canonical());
    }

    #[test]
    fn test_index_by_name() {
        let root = sample_tree();
        let result = resolve_path(&root, "/index/extra").unwrap();
        assert_eq!(result.handler().name(), "root_index");
        assert_eq!(result.remainder(), ["extra"]);
    }

    #[test]
    fn test_leaf_handler_keeps_remainder() {
        let root = sample_tree();
        let result = resolve_path(&root, "/about/one/two").unwrap();
        assert_eq!(result.handler().name(), "about");
        assert_eq!(result.remainder(), ["one", "two"]);
    }

    #[test]
    fn test_lookup_continues_from_new_node() {
        let root = sample_tree();
        let mut ctx = RequestContext::new();
        let result = resolve(&root, &split_path("/items/42/name"), &mut ctx).unwrap();
        assert_eq!(result.handler().name(), "item_name");
        assert!(result.remainder().is_empty());
        assert_eq!(ctx.take_routing_args(), Some(vec!["42".to_string()]));
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let root = sample_tree();
        assert!(resolve_path(&root, "/items/missing/name")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_lookup_without_varargs_is_configuration_error() {
        let root = Arc::new(HandlerNode::new("root").with_lookup(
            Signature::new().param("segment"),
            |_, _, rest| Ok((Arc::new(HandlerNode::new("x")), rest.to_vec())),
        ));
        let err = resolve_path(&root, "/anything").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_default_takes_entire_remainder() {
        let root = sample_tree();
        let result = resolve_path(&root, "/files/a/b.txt").unwrap();
        assert_eq!(result.handler().name(), "files_default");
        assert_eq!(result.remainder(), ["a", "b.txt"]);
    }

    #[test]
    fn test_ancestor_default_salvages_failed_subtree() {
        let root = Arc::new(
            HandlerNode::new("root")
                .with_default(page("fallback"))
                .with_child("sub", HandlerNode::new("sub").with_handler("known", page("known"))),
        );
        let result = resolve_path(&root, "/sub/unknown").unwrap();
        assert_eq!(result.handler().name(), "fallback");
        assert_eq!(result.remainder(), ["sub", "unknown"]);
    }

    #[test]
    fn test_miss_below_lookup_result_is_final() {
        let root = Arc::new(
            HandlerNode::new("root").with_default(page("fallback")).with_child(
                "items",
                HandlerNode::new("items")
                    .with_default(page("items_default"))
                    .with_lookup(lookup_signature(), |_, id, rest| {
                        if id == "missing" {
                            return Err(DispatchError::not_found("no such item"));
                        }
                        let item = HandlerNode::new("item").with_handler("name", page("item_name"));
                        Ok((Arc::new(item), rest.to_vec()))
                    }),
            ),
        );

        let result = resolve_path(&root, "/items/42/name").unwrap();
        assert_eq!(result.handler().name(), "item_name");
        assert!(resolve_path(&root, "/items/42/unknown")
            .unwrap_err()
            .is_not_found());

        let result = resolve_path(&root, "/items/missing/name").unwrap();
        assert_eq!(result.handler().name(), "items_default");
        assert_eq!(result.remainder(), ["missing", "name"]);
    }

    #[test]
    fn test_route_override_resolves_remainder() {
        let target = Arc::new(page("routed"));
        let root = Arc::new(HandlerNode::new("root").with_route(move |_, path| {
            Ok((Target::Handler(Arc::clone(&target)), path.iter().skip(1).cloned().collect()))
        }));
        let result = resolve_path(&root, "/v1/a/b").unwrap();
        assert_eq!(result.handler().name(), "routed");
        assert_eq!(result.remainder(), ["a", "b"]);
    }

    #[test]
    fn test_not_found() {
        let root = sample_tree();
        assert!(resolve_path(&root, "/nope").unwrap_err().is_not_found());
        let bare = Arc::new(HandlerNode::new("bare"));
        assert!(resolve_path(&bare, "/").unwrap_err().is_not_found());
    }

    #[test]
    fn test_guards_accumulate_and_unlock() {
        let guard = Guard::new(|_, _| false);
        let root = Arc::new(
            HandlerNode::new("root").with_child(
                "secret",
                HandlerNode::new("secret")
                    .with_guard(guard)
                    .with_handler("data", page("data"))
                    .with_unlocked_handler("login", page("login")),
            ),
        );
        assert_eq!(resolve_path(&root, "/secret/data").unwrap().guards().len(), 1);
        assert!(resolve_path(&root, "/secret/login").unwrap().guards().is_empty());
    }

    #[test]
    fn test_node_hooks_are_collected() {
        struct Marker;
        impl Hook for Marker {
            fn name(&self) -> &str {
                "marker"
            }
        }

        let root = Arc::new(
            HandlerNode::new("root")
                .with_handler("outside", page("outside"))
                .with_child(
                    "hooked",
                    HandlerNode::new("hooked")
                        .with_hook(Marker)
                        .with_handler("inside", page("inside")),
                ),
        );
        assert_eq!(resolve_path(&root, "/hooked/inside").unwrap().hooks().len(), 1);
        assert!(resolve_path(&root, "/outside").unwrap().hooks().is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let root = sample_tree();
        for path in ["/", "/sub", "/sub/sub/deeper", "/files/x", "/about/1"] {
            assert_eq!(
                resolve_path(&root, path).unwrap(),
                resolve_path(&root, path).unwrap()
            );
        }
    }

    proptest! {
        #[test]
        fn prop_remainder_is_suffix(segments in prop::collection::vec("[a-z]{0,6}", 0..6)) {
            let root = sample_tree();
            let path: Vec<String> = ["files".to_string()].into_iter().chain(segments).collect();
            let result = resolve(&root, &path, &mut RequestContext::new()).unwrap();
            prop_assert!(path.ends_with(result.remainder()));
        }

        #[test]
        fn prop_resolution_is_deterministic(segments in prop::collection::vec("(sub|about|index|files|[a-z]{1,4}|)", 0..5)) {
            let root = sample_tree();
            let first = resolve(&root, &segments, &mut RequestContext::new());
            let second = resolve(&root, &segments, &mut RequestContext::new());
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                (Err(a), Err(b)) => prop_assert_eq!(a.category(), b.category()),
                _ => prop_assert!(false, "outcomes differ"),
            }
        }
    }
}
