//! Validation metadata attached to handlers.
//!
//! Schema libraries are external collaborators; Arbor only needs the
//! [`Schema`] seam and the options that tell the dispatcher how to feed it
//! and what to do when it rejects the input.

use crate::context::RequestContext;
use crate::error::FieldErrors;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A validation schema.
///
/// Returns the cleaned input, or the field-level errors.
///
/// # Example
///
/// ```
/// use arbor_core::{FieldErrors, Schema};
/// use serde_json::{json, Value};
///
/// let schema = |input: &Value| -> Result<Value, FieldErrors> {
///     match input.get("name").and_then(Value::as_str) {
///         Some(name) if !name.is_empty() => Ok(input.clone()),
///         _ => Err(FieldErrors::from_iter([("name", "Please enter a value")])),
///     }
/// };
///
/// assert!(schema.validate(&json!({"name": "ada"})).is_ok());
/// assert!(schema.validate(&json!({})).is_err());
/// ```
pub trait Schema: Send + Sync + 'static {
    /// Validates and converts `input`.
    fn validate(&self, input: &Value) -> Result<Value, FieldErrors>;
}

impl<F> Schema for F
where
    F: Fn(&Value) -> Result<Value, FieldErrors> + Send + Sync + 'static,
{
    fn validate(&self, input: &Value) -> Result<Value, FieldErrors> {
        self(input)
    }
}

/// Where a rejected request is forwarded.
#[derive(Clone)]
pub enum ErrorHandler {
    /// A fixed path.
    Path(String),
    /// A path computed from the failed request's context.
    Dynamic(Arc<dyn Fn(&RequestContext) -> String + Send + Sync>),
}

impl ErrorHandler {
    /// Returns the forward location for this request.
    #[must_use]
    pub fn location(&self, ctx: &RequestContext) -> String {
        match self {
            Self::Path(path) => path.clone(),
            Self::Dynamic(f) => f(ctx),
        }
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Separators for decoding flat keys into nested structures.
///
/// With the defaults, `address.city` becomes `{"address": {"city": ..}}`
/// and `tags-0` becomes `{"tags": [..]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Separator between nested object keys.
    pub dict_char: char,
    /// Separator before a list index.
    pub list_char: char,
    /// Deepest nesting a single key may spell out.
    pub max_depth: usize,
}

/// Default for [`DecodeOptions::max_depth`].
pub const DEFAULT_MAX_DECODE_DEPTH: usize = 32;

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            dict_char: '.',
            list_char: '-',
            max_depth: DEFAULT_MAX_DECODE_DEPTH,
        }
    }
}

/// Validation declared on a handler.
#[derive(Clone)]
pub struct Validation {
    schema: Arc<dyn Schema>,
    error_handler: Option<ErrorHandler>,
    json: bool,
    fill_options: Option<Value>,
    variable_decode: Option<DecodeOptions>,
}

impl Validation {
    /// Creates a validation for `schema`, without an error handler.
    #[must_use]
    pub fn new(schema: impl Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            error_handler: None,
            json: false,
            fill_options: None,
            variable_decode: None,
        }
    }

    /// Forwards rejected requests to a fixed path.
    #[must_use]
    pub fn error_handler(mut self, path: impl Into<String>) -> Self {
        self.error_handler = Some(ErrorHandler::Path(path.into()));
        self
    }

    /// Forwards rejected requests to a path computed from the context.
    #[must_use]
    pub fn error_handler_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        self.error_handler = Some(ErrorHandler::Dynamic(Arc::new(f)));
        self
    }

    /// Validates the JSON request body instead of the form parameters.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Enables form refill with the given filler options.
    #[must_use]
    pub fn fill_options(mut self, options: Value) -> Self {
        self.fill_options = Some(options);
        self
    }

    /// Decodes flat keys into nested structures before validating.
    #[must_use]
    pub fn variable_decode(mut self, options: DecodeOptions) -> Self {
        self.variable_decode = Some(options);
        self
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &dyn Schema {
        self.schema.as_ref()
    }

    /// Returns the error handler.
    #[must_use]
    pub const fn error_handler_ref(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    /// Returns `true` if the JSON body is validated.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Returns the form refill options.
    #[must_use]
    pub const fn fill_options_ref(&self) -> Option<&Value> {
        self.fill_options.as_ref()
    }

    /// Returns the variable decoding options.
    #[must_use]
    pub const fn decode_options(&self) -> Option<DecodeOptions> {
        self.variable_decode
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("error_handler", &self.error_handler)
            .field("json", &self.json)
            .field("fill_options", &self.fill_options)
            .field("variable_decode", &self.variable_decode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dynamic_error_handler_sees_context() {
        let mut ctx = RequestContext::new();
        ctx.set_routing_path("/users/7/save");
        let handler = ErrorHandler::Dynamic(Arc::new(|ctx: &RequestContext| {
            ctx.routing_path().replace("/save", "/edit")
        }));
        assert_eq!(handler.location(&ctx), "/users/7/edit");
    }

    #[test]
    fn test_validation_builder() {
        let validation = Validation::new(|v: &Value| -> Result<Value, FieldErrors> { Ok(v.clone()) })
            .error_handler("/form")
            .json()
            .fill_options(json!({"auto_error_formatter": null}))
            .variable_decode(DecodeOptions::default());

        assert!(validation.is_json());
        assert!(validation.fill_options_ref().is_some());
        assert_eq!(validation.decode_options(), Some(DecodeOptions::default()));
        assert!(matches!(
            validation.error_handler_ref(),
            Some(ErrorHandler::Path(p)) if p == "/form"
        ));
        assert_eq!(validation.schema().validate(&json!(1)).unwrap(), json!(1));
    }
}
