//! Handler tree nodes.
//!
//! A [`HandlerNode`] is a container in the handler namespace. Instead of
//! probing attributes at runtime, every node exposes typed optional slots:
//!
//! | Slot | Consulted when |
//! |---|---|
//! | named children | the next segment names one |
//! | `index` | the path ends at this node |
//! | `route` | no child matches; it resolves the whole remainder |
//! | `lookup` | no child matches; it builds a node for the next segment |
//! | `default` | nothing else matched; it takes the whole remainder |
//!
//! Nodes are built once, wrapped in `Arc`, and never mutated afterwards.

use arbor_core::{DispatchResult, Guard, Handler, Hook, RequestContext, Signature};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The literal segment that addresses a node's index handler.
pub const INDEX_SEGMENT: &str = "index";

/// What a child link or a route override points at.
#[derive(Clone)]
pub enum Target {
    /// A nested node; resolution continues inside it.
    Node(Arc<HandlerNode>),
    /// A terminal handler.
    Handler(Arc<Handler>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(&node.name).finish(),
            Self::Handler(handler) => f.debug_tuple("Handler").field(&handler.name()).finish(),
        }
    }
}

/// A named link from a node to a child.
#[derive(Debug, Clone)]
pub struct Child {
    target: Target,
    unlocked: bool,
}

impl Child {
    /// Returns the link target.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Returns `true` if crossing this link clears inherited guards.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

/// Callable behind a lookup: `(context, segment, rest) -> (node, remainder)`.
pub type LookupFn = Arc<
    dyn Fn(&mut RequestContext, &str, &[String]) -> DispatchResult<(Arc<HandlerNode>, Vec<String>)>
        + Send
        + Sync,
>;

/// Callable behind a route override: `(context, path) -> (target, remainder)`.
pub type RouteFn =
    Arc<dyn Fn(&mut RequestContext, &[String]) -> DispatchResult<(Target, Vec<String>)> + Send + Sync>;

/// A dynamic child resolver.
#[derive(Clone)]
pub struct Lookup {
    signature: Signature,
    func: LookupFn,
}

impl Lookup {
    /// Returns the declared signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Calls the lookup.
    pub fn call(
        &self,
        ctx: &mut RequestContext,
        segment: &str,
        rest: &[String],
    ) -> DispatchResult<(Arc<HandlerNode>, Vec<String>)> {
        (self.func)(ctx, segment, rest)
    }
}

/// A node in the handler tree.
///
/// # Example
///
/// ```
/// use arbor_core::{Handler, Reply};
/// use arbor_router::HandlerNode;
///
/// fn page(name: &'static str) -> Handler {
///     Handler::new(name, move |_| async move { Ok(Reply::text(name)) })
/// }
///
/// let root = HandlerNode::new("root")
///     .with_index(page("home"))
///     .with_child(
///         "docs",
///         HandlerNode::new("docs")
///             .with_index(page("docs"))
///             .with_handler("faq", page("faq")),
///     );
///
/// assert!(root.index().is_some());
/// assert!(root.child("docs").is_some());
/// assert!(root.child("missing").is_none());
/// ```
#[derive(Clone)]
pub struct HandlerNode {
    name: String,
    children: HashMap<String, Child>,
    index: Option<Arc<Handler>>,
    default: Option<Arc<Handler>>,
    lookup: Option<Lookup>,
    route: Option<RouteFn>,
    hooks: Vec<Arc<dyn Hook>>,
    guard: Option<Guard>,
}

impl HandlerNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: HashMap::new(),
            index: None,
            default: None,
            lookup: None,
            route: None,
            hooks: Vec::new(),
            guard: None,
        }
    }

    /// Sets the index handler.
    #[must_use]
    pub fn with_index(mut self, handler: impl Into<Arc<Handler>>) -> Self {
        self.index = Some(handler.into());
        self
    }

    /// Sets the default handler.
    #[must_use]
    pub fn with_default(mut self, handler: impl Into<Arc<Handler>>) -> Self {
        self.default = Some(handler.into());
        self
    }

    /// Adds a terminal handler under `name`.
    #[must_use]
    pub fn with_handler(self, name: impl Into<String>, handler: impl Into<Arc<Handler>>) -> Self {
        self.link(name.into(), Target::Handler(handler.into()), false)
    }

    /// Adds a nested node under `name`.
    #[must_use]
    pub fn with_child(self, name: impl Into<String>, node: impl Into<Arc<HandlerNode>>) -> Self {
        self.link(name.into(), Target::Node(node.into()), false)
    }

    /// Adds a terminal handler that bypasses the guards above it.
    #[must_use]
    pub fn with_unlocked_handler(
        self,
        name: impl Into<String>,
        handler: impl Into<Arc<Handler>>,
    ) -> Self {
        self.link(name.into(), Target::Handler(handler.into()), true)
    }

    /// Adds a nested node that bypasses the guards above it.
    #[must_use]
    pub fn with_unlocked_child(
        self,
        name: impl Into<String>,
        node: impl Into<Arc<HandlerNode>>,
    ) -> Self {
        self.link(name.into(), Target::Node(node.into()), true)
    }

    fn link(mut self, name: String, target: Target, unlocked: bool) -> Self {
        self.children.insert(name, Child { target, unlocked });
        self
    }

    /// Sets the lookup.
    ///
    /// The signature must declare at least one positional parameter and
    /// accept a variadic remainder; the resolver rejects anything else as a
    /// configuration error when the lookup is first needed.
    #[must_use]
    pub fn with_lookup<F>(mut self, signature: Signature, func: F) -> Self
    where
        F: Fn(&mut RequestContext, &str, &[String]) -> DispatchResult<(Arc<HandlerNode>, Vec<String>)>
            + Send
            + Sync
            + 'static,
    {
        self.lookup = Some(Lookup {
            signature,
            func: Arc::new(func),
        });
        self
    }

    /// Sets the route override.
    #[must_use]
    pub fn with_route<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut RequestContext, &[String]) -> DispatchResult<(Target, Vec<String>)>
            + Send
            + Sync
            + 'static,
    {
        self.route = Some(Arc::new(func));
        self
    }

    /// Declares a hook for every handler in this subtree.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Hook) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Secures this subtree.
    #[must_use]
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the child linked under `segment`.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Child> {
        self.children.get(segment)
    }

    /// Returns the index handler.
    #[must_use]
    pub const fn index(&self) -> Option<&Arc<Handler>> {
        self.index.as_ref()
    }

    /// Returns the default handler.
    #[must_use]
    pub const fn default_handler(&self) -> Option<&Arc<Handler>> {
        self.default.as_ref()
    }

    /// Returns the lookup.
    #[must_use]
    pub const fn lookup(&self) -> Option<&Lookup> {
        self.lookup.as_ref()
    }

    /// Returns the route override.
    #[must_use]
    pub const fn route(&self) -> Option<&RouteFn> {
        self.route.as_ref()
    }

    /// Returns the hooks declared on this node.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the guard.
    #[must_use]
    pub const fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }
}

impl fmt::Debug for HandlerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut children: Vec<_> = self.children.keys().collect();
        children.sort();
        f.debug_struct("HandlerNode")
            .field("name", &self.name)
            .field("children", &children)
            .field("index", &self.index.as_ref().map(|h| h.name()))
            .field("default", &self.default.as_ref().map(|h| h.name()))
            .field("lookup", &self.lookup.is_some())
            .field("route", &self.route.is_some())
            .field("hooks", &self.hooks.len())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
