//! Request context types.
//!
//! The [`RequestContext`] is the per-request state bag shared by the
//! resolver, hooks, the argument binder and handlers. One context exists per
//! dispatch cycle; it is dropped when the cycle ends, on every exit path.

use crate::error::FieldErrors;
use crate::request::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate and sort.
///
/// # Example
///
/// ```
/// use arbor_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request mutable state.
///
/// Hooks read and write it through [`DispatchState`](crate::DispatchState);
/// lookups and route overrides receive it during resolution; handlers get a
/// snapshot in their [`Invocation`](crate::Invocation).
///
/// # Example
///
/// ```
/// use arbor_core::RequestContext;
///
/// let mut ctx = RequestContext::new();
/// ctx.set_content_type(Some("application/json".to_string()));
/// ctx.set_routing_args(vec!["42".to_string()]);
///
/// assert_eq!(ctx.content_type(), Some("application/json"));
/// assert_eq!(ctx.take_routing_args(), Some(vec!["42".to_string()]));
/// assert_eq!(ctx.take_routing_args(), None);
/// ```
#[derive(Clone)]
pub struct RequestContext {
    request_id: RequestId,
    started_at: Instant,

    /// Content type forced by the caller (extension) or resolved from the
    /// handler's exposure.
    content_type: Option<String>,

    /// Extension stripped from the routing path, including its dot.
    extension: Option<String>,

    /// Path the resolver walks; hooks may rewrite it during `on_route`.
    routing_path: String,

    validation_errors: FieldErrors,
    override_template: Option<Option<String>>,
    override_content_type: Option<String>,

    /// Segments stashed by a lookup, prepended to the remainder at binding.
    routing_args: Option<Vec<String>>,

    /// Original parameters kept for refilling a rejected form.
    refill_params: Option<Params>,

    /// Options for the form filler, carried across internal forwards.
    fill_options: Option<Value>,

    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    ///
    /// Internal forwards keep the ID of the request that triggered them.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            content_type: None,
            extension: None,
            routing_path: String::new(),
            validation_errors: FieldErrors::new(),
            override_template: None,
            override_content_type: None,
            routing_args: None,
            refill_params: None,
            fill_options: None,
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the resolved or forced content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Sets the content type. `None` means "no content type".
    pub fn set_content_type(&mut self, content_type: Option<String>) {
        self.content_type = content_type;
    }

    /// Returns the stripped path extension, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Records the stripped path extension.
    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = Some(extension.into());
    }

    /// Returns the path used for routing.
    #[must_use]
    pub fn routing_path(&self) -> &str {
        &self.routing_path
    }

    /// Replaces the path used for routing.
    pub fn set_routing_path(&mut self, path: impl Into<String>) {
        self.routing_path = path.into();
    }

    /// Returns the validation errors of this request.
    #[must_use]
    pub fn validation_errors(&self) -> &FieldErrors {
        &self.validation_errors
    }

    /// Replaces the validation errors.
    pub fn set_validation_errors(&mut self, errors: FieldErrors) {
        self.validation_errors = errors;
    }

    /// Returns the template override.
    ///
    /// `Some(None)` means the handler explicitly asked for no template.
    #[must_use]
    pub fn override_template(&self) -> Option<Option<&str>> {
        self.override_template.as_ref().map(Option::as_deref)
    }

    /// Overrides the template chosen from the handler's exposure.
    pub fn set_override_template(&mut self, template: Option<String>) {
        self.override_template = Some(template);
    }

    /// Returns the content type override.
    #[must_use]
    pub fn override_content_type(&self) -> Option<&str> {
        self.override_content_type.as_deref()
    }

    /// Overrides the response content type.
    pub fn set_override_content_type(&mut self, content_type: impl Into<String>) {
        self.override_content_type = Some(content_type.into());
    }

    /// Stashes routing arguments for the argument binder.
    pub fn set_routing_args(&mut self, args: Vec<String>) {
        self.routing_args = Some(args);
    }

    /// Removes and returns the stashed routing arguments.
    pub fn take_routing_args(&mut self) -> Option<Vec<String>> {
        self.routing_args.take()
    }

    /// Returns the parameters stashed for form refill.
    #[must_use]
    pub fn refill_params(&self) -> Option<&Params> {
        self.refill_params.as_ref()
    }

    /// Stashes parameters for form refill.
    pub fn set_refill_params(&mut self, params: Params) {
        self.refill_params = Some(params);
    }

    /// Returns the stashed refill parameters, creating them from `seed` if
    /// none exist yet.
    pub fn refill_params_or_insert(&mut self, seed: impl FnOnce() -> Params) -> &mut Params {
        self.refill_params.get_or_insert_with(seed)
    }

    /// Returns the form filler options.
    #[must_use]
    pub fn fill_options(&self) -> Option<&Value> {
        self.fill_options.as_ref()
    }

    /// Sets the form filler options.
    pub fn set_fill_options(&mut self, options: Value) {
        self.fill_options = Some(options);
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use arbor_core::RequestContext;
    ///
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = RequestContext::new();
    /// ctx.set_extension_value(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>().map(|t| t.0), Some("acme"));
    /// ```
    pub fn set_extension_value<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("content_type", &self.content_type)
            .field("extension", &self.extension)
            .field("routing_path", &self.routing_path)
            .field("validation_errors", &self.validation_errors)
            .field("override_template", &self.override_template)
            .field("override_content_type", &self.override_content_type)
            .field("routing_args", &self.routing_args)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}
