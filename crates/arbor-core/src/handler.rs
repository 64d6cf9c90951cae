//! Handlers and their metadata.
//!
//! A [`Handler`] couples an async callable with everything the dispatcher
//! needs to call it: the declared [`Signature`], the [`Exposure`] table
//! mapping content types to templates, declared hooks, validation, an
//! optional guard and the canonicalization exemption.
//!
//! Handlers come in two kinds:
//!
//! - [`HandlerKind::Endpoint`]: called with bound [`Arguments`].
//! - [`HandlerKind::Generic`]: a [`MethodTable`] fanning out to per-method
//!   variants. The dispatcher selects the variant; calling a generic handler
//!   directly always fails with `NotFound`.
//!
//! # Example
//!
//! ```
//! use arbor_core::{Handler, Reply, Signature};
//!
//! let show = Handler::new("show", |inv| async move {
//!     let id = inv.arg_str("id").unwrap_or_default().to_string();
//!     Ok(Reply::text(format!("item {id}")))
//! })
//! .signature(Signature::new().param("id"))
//! .template("item.html");
//!
//! assert_eq!(show.exposure().template_for(Some("text/html")), Some("item.html"));
//! ```

use crate::context::RequestContext;
use crate::error::{DispatchError, DispatchResult};
use crate::guard::Guard;
use crate::hook::Hook;
use crate::request::{Params, Request};
use crate::response::Response;
use crate::validation::Validation;
use bytes::Bytes;
use http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::{ready, Future};
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The type-erased handler callable.
pub type HandlerFn = Arc<dyn Fn(Invocation) -> BoxFuture<'static, DispatchResult<Reply>> + Send + Sync>;

/// The default content type of an exposed handler.
pub const TEXT_HTML: &str = "text/html";

/// The content type of structured-data responses.
pub const APPLICATION_JSON: &str = "application/json";

/// Reserved template name that serializes the result as JSON.
pub const JSON_TEMPLATE: &str = "json";

/// A declared parameter signature.
///
/// Defaults pair with the rightmost parameters: with params
/// `[a, b, c]` and defaults `[1, 2]`, `b` defaults to `1` and `c` to `2`.
///
/// # Example
///
/// ```
/// use arbor_core::Signature;
/// use serde_json::json;
///
/// let sig = Signature::new()
///     .param("id")
///     .optional("page", json!("1"))
///     .varkw();
///
/// assert_eq!(sig.params(), ["id", "page"]);
/// assert_eq!(sig.default_for("page"), Some(&json!("1")));
/// assert!(sig.accepts_varkw());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<String>,
    defaults: Vec<Value>,
    varargs: bool,
    varkw: bool,
}

impl Signature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a required positional parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Appends required positional parameters.
    #[must_use]
    pub fn params_from<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    /// Appends a positional parameter with a default value.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, default: Value) -> Self {
        self.params.push(name.into());
        self.defaults.push(default);
        self
    }

    /// Accepts a variadic positional remainder.
    #[must_use]
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Accepts variadic keyword arguments.
    #[must_use]
    pub fn varkw(mut self) -> Self {
        self.varkw = true;
        self
    }

    /// Returns the declared positional parameter names.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns `true` if `name` is a declared parameter.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    /// Returns the position of a declared parameter.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    /// Returns the default value of a parameter.
    #[must_use]
    pub fn default_for(&self, name: &str) -> Option<&Value> {
        let offset = self.params.len().saturating_sub(self.defaults.len());
        let index = self.position(name)?;
        index
            .checked_sub(offset)
            .and_then(|i| self.defaults.get(i))
    }

    /// Returns `true` if a variadic positional remainder is accepted.
    #[must_use]
    pub const fn accepts_varargs(&self) -> bool {
        self.varargs
    }

    /// Returns `true` if variadic keyword arguments are accepted.
    #[must_use]
    pub const fn accepts_varkw(&self) -> bool {
        self.varkw
    }
}

/// Arguments produced by the binder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    keyword: Params,
}

impl Arguments {
    /// Creates arguments.
    #[must_use]
    pub fn new(positional: Vec<Value>, keyword: Params) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Returns the keyword arguments.
    #[must_use]
    pub const fn keyword(&self) -> &Params {
        &self.keyword
    }
}

/// Everything a handler receives when it is called.
#[derive(Debug, Clone)]
pub struct Invocation {
    signature: Signature,
    args: Arguments,
    request: Request,
    context: RequestContext,
}

impl Invocation {
    /// Creates an invocation.
    #[must_use]
    pub fn new(
        signature: Signature,
        args: Arguments,
        request: Request,
        context: RequestContext,
    ) -> Self {
        Self {
            signature,
            args,
            request,
            context,
        }
    }

    /// Returns the value bound to a declared parameter.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.signature
            .position(name)
            .and_then(|i| self.args.positional.get(i))
    }

    /// Returns the value bound to a declared parameter as a string.
    #[must_use]
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    /// Returns the positional arguments beyond the declared parameters.
    #[must_use]
    pub fn varargs(&self) -> &[Value] {
        self.args
            .positional
            .get(self.signature.params.len()..)
            .unwrap_or_default()
    }

    /// Returns the variadic keyword arguments.
    #[must_use]
    pub const fn kwargs(&self) -> &Params {
        &self.args.keyword
    }

    /// Returns the bound arguments.
    #[must_use]
    pub const fn args(&self) -> &Arguments {
        &self.args
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Returns a snapshot of the request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// The result a handler produced.
#[derive(Debug, Clone)]
pub enum Output {
    /// Structured data, rendered through a template.
    Data(Value),
    /// Text, used as the body when no template applies.
    Text(String),
    /// Binary content.
    Bytes(Bytes),
    /// A finished response; no rendering takes place.
    Response(Response),
}

/// A handler's reply: its output plus optional template and content-type
/// overrides.
///
/// # Example
///
/// ```
/// use arbor_core::Reply;
/// use serde_json::json;
///
/// let reply = Reply::data(json!({"name": "ada"}))
///     .with_template(Some("profile.html"))
///     .with_content_type("text/html");
/// assert_eq!(reply.template_override(), Some(Some("profile.html")));
/// ```
#[derive(Debug, Clone)]
pub struct Reply {
    output: Output,
    template: Option<Option<String>>,
    content_type: Option<String>,
}

impl Reply {
    fn from_output(output: Output) -> Self {
        Self {
            output,
            template: None,
            content_type: None,
        }
    }

    /// Replies with structured data.
    #[must_use]
    pub fn data(value: Value) -> Self {
        Self::from_output(Output::Data(value))
    }

    /// Replies with any serializable value.
    pub fn serialize<T: Serialize>(value: &T) -> DispatchResult<Self> {
        serde_json::to_value(value)
            .map(Self::data)
            .map_err(DispatchError::upstream)
    }

    /// Replies with text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_output(Output::Text(text.into()))
    }

    /// Replies with bytes.
    #[must_use]
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_output(Output::Bytes(bytes.into()))
    }

    /// Replies with a finished response.
    #[must_use]
    pub fn response(response: Response) -> Self {
        Self::from_output(Output::Response(response))
    }

    /// Overrides the template. `None` renders without a template.
    #[must_use]
    pub fn with_template(mut self, template: Option<&str>) -> Self {
        self.template = Some(template.map(ToString::to_string));
        self
    }

    /// Overrides the response content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the output.
    #[must_use]
    pub const fn output(&self) -> &Output {
        &self.output
    }

    /// Returns the template override.
    #[must_use]
    pub fn template_override(&self) -> Option<Option<&str>> {
        self.template.as_ref().map(Option::as_deref)
    }

    /// Splits the reply into output, template override and content-type
    /// override.
    #[must_use]
    pub fn into_parts(self) -> (Output, Option<Option<String>>, Option<String>) {
        (self.output, self.template, self.content_type)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::data(value)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// Content types a handler is exposed for, and the template for each.
///
/// A fresh exposure serves `text/html` without a template. The first
/// explicit [`expose`](Exposure::expose) replaces that default; later calls
/// add content types and make the newest one the default.
#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    content_type: Option<String>,
    templates: IndexMap<Option<String>, Option<String>>,
    declared: bool,
}

impl Default for Exposure {
    fn default() -> Self {
        let mut templates = IndexMap::new();
        templates.insert(Some(TEXT_HTML.to_string()), None);
        Self {
            content_type: Some(TEXT_HTML.to_string()),
            templates,
            declared: false,
        }
    }
}

impl Exposure {
    /// Declares a template for a content type.
    ///
    /// The template `"json"` always pairs with `application/json`. A `None`
    /// content type exposes the handler without a fixed content type.
    pub fn expose(&mut self, template: Option<&str>, content_type: Option<&str>) {
        if !self.declared {
            self.templates.clear();
            self.declared = true;
        }
        let content_type = if template == Some(JSON_TEMPLATE) {
            Some(APPLICATION_JSON)
        } else {
            content_type
        };
        let content_type = content_type.map(ToString::to_string);
        self.content_type.clone_from(&content_type);
        self.templates
            .insert(content_type, template.map(ToString::to_string));
    }

    /// Returns the default content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the template for a content type.
    #[must_use]
    pub fn template_for(&self, content_type: Option<&str>) -> Option<&str> {
        self.templates
            .iter()
            .find(|(ct, _)| ct.as_deref() == content_type)
            .and_then(|(_, template)| template.as_deref())
    }

    /// Returns `true` if the handler is exposed for `content_type`.
    #[must_use]
    pub fn allows(&self, content_type: &str) -> bool {
        self.templates
            .keys()
            .any(|ct| ct.as_deref() == Some(content_type))
    }
}

/// Per-method variants of a generic handler.
#[derive(Clone)]
pub struct MethodTable {
    default: Arc<Handler>,
    variants: HashMap<Method, Arc<Handler>>,
}

impl MethodTable {
    /// Selects the variant for `method`, falling back to the default.
    #[must_use]
    pub fn select(&self, method: &Method) -> &Arc<Handler> {
        self.variants.get(method).unwrap_or(&self.default)
    }

    /// Returns the fallback variant.
    #[must_use]
    pub const fn default_variant(&self) -> &Arc<Handler> {
        &self.default
    }
}

/// The kind of a handler.
#[derive(Clone)]
pub enum HandlerKind {
    /// A callable endpoint.
    Endpoint(HandlerFn),
    /// A method-dispatch placeholder; never called directly.
    Generic(MethodTable),
}

/// A request handler with its metadata.
#[derive(Clone)]
pub struct Handler {
    name: String,
    kind: HandlerKind,
    signature: Signature,
    exposure: Exposure,
    hooks: Vec<Arc<dyn Hook>>,
    validation: Option<Validation>,
    accept_noncanonical: bool,
    guard: Option<Guard>,
}

impl Handler {
    /// Creates an endpoint handler.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<Reply>> + Send + 'static,
    {
        let erased: HandlerFn =
            Arc::new(move |inv: Invocation| -> BoxFuture<'static, DispatchResult<Reply>> {
                Box::pin(func(inv))
            });
        Self::with_kind(name.into(), HandlerKind::Endpoint(erased))
    }

    /// Creates a generic handler; `default` serves methods without a
    /// registered variant.
    pub fn generic(name: impl Into<String>, default: Handler) -> Self {
        Self::with_kind(
            name.into(),
            HandlerKind::Generic(MethodTable {
                default: Arc::new(default),
                variants: HashMap::new(),
            }),
        )
    }

    fn with_kind(name: String, kind: HandlerKind) -> Self {
        Self {
            name,
            kind,
            signature: Signature::default(),
            exposure: Exposure::default(),
            hooks: Vec::new(),
            validation: None,
            accept_noncanonical: false,
            guard: None,
        }
    }

    /// Registers the variant for an HTTP method on a generic handler.
    ///
    /// Has no effect on endpoint handlers.
    #[must_use]
    pub fn when(mut self, method: Method, variant: Handler) -> Self {
        if let HandlerKind::Generic(table) = &mut self.kind {
            table.variants.insert(method, Arc::new(variant));
        } else {
            tracing::warn!(handler = %self.name, "ignoring method variant on a non-generic handler");
        }
        self
    }

    /// Sets the declared parameter signature.
    #[must_use]
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Exposes the handler with a template for a content type.
    #[must_use]
    pub fn expose(mut self, template: Option<&str>, content_type: Option<&str>) -> Self {
        self.exposure.expose(template, content_type);
        self
    }

    /// Exposes the handler as `text/html` rendered with `template`.
    #[must_use]
    pub fn template(self, template: &str) -> Self {
        self.expose(Some(template), Some(TEXT_HTML))
    }

    /// Exposes the handler as JSON.
    #[must_use]
    pub fn json(self) -> Self {
        self.expose(Some(JSON_TEMPLATE), None)
    }

    /// Declares a hook that runs only for this handler.
    #[must_use]
    pub fn hook(mut self, hook: impl Hook) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Declares validation.
    #[must_use]
    pub fn validate(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Exempts the handler from canonical trailing-slash redirects.
    #[must_use]
    pub fn accept_noncanonical(mut self) -> Self {
        self.accept_noncanonical = true;
        self
    }

    /// Secures the handler.
    #[must_use]
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Returns the method table of a generic handler.
    #[must_use]
    pub const fn method_table(&self) -> Option<&MethodTable> {
        match &self.kind {
            HandlerKind::Generic(table) => Some(table),
            HandlerKind::Endpoint(_) => None,
        }
    }

    /// Returns the declared signature.
    #[must_use]
    pub const fn declared_signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the exposure table.
    #[must_use]
    pub const fn exposure(&self) -> &Exposure {
        &self.exposure
    }

    /// Returns the hooks declared on this handler.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the declared validation.
    #[must_use]
    pub const fn validation(&self) -> Option<&Validation> {
        self.validation.as_ref()
    }

    /// Returns `true` if canonical redirects are suppressed.
    #[must_use]
    pub const fn accepts_noncanonical(&self) -> bool {
        self.accept_noncanonical
    }

    /// Returns the guard.
    #[must_use]
    pub const fn guard_ref(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    /// Calls the handler.
    ///
    /// Fails with `NotFound` for generic handlers, and with an invocation
    /// error when the bound arguments do not satisfy the signature.
    pub fn call(&self, invocation: Invocation) -> BoxFuture<'static, DispatchResult<Reply>> {
        match &self.kind {
            HandlerKind::Generic(_) => Box::pin(ready(Err(DispatchError::not_found(format!(
                "generic handler '{}' cannot be called directly",
                self.name
            ))))),
            HandlerKind::Endpoint(func) => match self.check_arity(invocation.args()) {
                Ok(()) => func(invocation),
                Err(err) => Box::pin(ready(Err(err))),
            },
        }
    }

    fn check_arity(&self, args: &Arguments) -> DispatchResult<()> {
        let declared = self.signature.params.len();
        let given = args.positional.len();
        if given < declared {
            let missing = self.signature.params[given..].join(", ");
            return Err(DispatchError::invocation(
                &self.name,
                format!("takes {declared} positional arguments but {given} were given (missing: {missing})"),
            ));
        }
        if given > declared && !self.signature.varargs {
            return Err(DispatchError::invocation(
                &self.name,
                format!("takes {declared} positional arguments but {given} were given"),
            ));
        }
        if !self.signature.varkw && !args.keyword.is_empty() {
            return Err(DispatchError::invocation(
                &self.name,
                "got unexpected keyword arguments",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            HandlerKind::Endpoint(_) => "endpoint",
            HandlerKind::Generic(_) => "generic",
        };
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("signature", &self.signature)
            .field("exposure", &self.exposure)
            .field("hooks", &self.hooks.len())
            .field("validation", &self.validation)
            .field("accept_noncanonical", &self.accept_noncanonical)
            .finish_non_exhaustive()
    }
}
