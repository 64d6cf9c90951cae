//! Template rendering and form refill seams.
//!
//! Template engines are not part of Arbor. Applications register
//! [`Renderer`]s by name; a template string picks one:
//!
//! | Template | Renderer |
//! |---|---|
//! | `"json"` | built-in JSON serialization |
//! | `"mako:page.html"` | the renderer registered as `mako` |
//! | `"page.html"` | the configured default renderer |
//!
//! Renderers other than JSON receive [`TemplateHelpers`] so templates can
//! show validation errors and keep submitted values.

use arbor_core::{Body, DispatchError, DispatchResult, FieldErrors, Params, JSON_TEMPLATE};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A failure reported by a renderer or form filler.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but could not be rendered.
    #[error("Failed to render '{template}': {message}")]
    Failed {
        /// The template being rendered.
        template: String,
        /// Human-readable error message.
        message: String,
    },

    /// The form filler rejected the document.
    #[error("Form refill failed: {0}")]
    Fill(String),
}

/// Everything a renderer needs for one template.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Template name, without any `renderer:` prefix.
    pub template: &'a str,
    /// The handler's output.
    pub data: &'a Value,
    /// Variables registered on the application for every template.
    pub extra_vars: &'a Map<String, Value>,
    /// Request-bound helper functions.
    pub helpers: &'a TemplateHelpers,
    /// Configured template root.
    pub template_path: &'a str,
}

/// A template engine.
pub trait Renderer: Send + Sync + 'static {
    /// Renders one template.
    fn render(&self, request: RenderRequest<'_>) -> Result<Body, RenderError>;
}

/// Post-processes rendered HTML to refill a rejected form.
pub trait FormFiller: Send + Sync + 'static {
    /// Refills `body` with `defaults` and marks the fields in `errors`.
    fn fill(
        &self,
        body: &str,
        defaults: &Params,
        errors: &FieldErrors,
        options: &Value,
    ) -> Result<String, RenderError>;
}

/// Helpers bound to the request being rendered.
///
/// # Example
///
/// ```
/// use arbor_core::FieldErrors;
/// use arbor_dispatch::TemplateHelpers;
/// use serde_json::json;
///
/// let helpers = TemplateHelpers::new(FieldErrors::from_iter([("email", "Invalid")]));
/// assert_eq!(helpers.error_for("email"), "Invalid");
/// assert_eq!(helpers.error_for("name"), "");
///
/// assert_eq!(helpers.sticky("name", json!("ada")), json!("ada"));
/// assert_eq!(helpers.take_sticky(), vec![("name".to_string(), json!("ada"))]);
/// ```
#[derive(Debug, Default)]
pub struct TemplateHelpers {
    errors: FieldErrors,
    sticky: Mutex<Vec<(String, Value)>>,
}

impl TemplateHelpers {
    /// Creates helpers over the request's validation errors.
    #[must_use]
    pub fn new(errors: FieldErrors) -> Self {
        Self {
            errors,
            sticky: Mutex::new(Vec::new()),
        }
    }

    /// Returns the validation error for `field`, or an empty string.
    #[must_use]
    pub fn error_for(&self, field: &str) -> &str {
        self.errors.get(field).unwrap_or_default()
    }

    /// Echoes `value` and records it as the refill value of `field`.
    pub fn sticky(&self, field: &str, value: Value) -> Value {
        self.sticky.lock().push((field.to_string(), value.clone()));
        value
    }

    /// Drains the values recorded by [`sticky`](Self::sticky).
    pub fn take_sticky(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.sticky.lock())
    }
}

/// Named renderers plus the variables shared by every template.
#[derive(Default, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
    extra_vars: Map<String, Value>,
}

impl RendererRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a renderer, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, renderer: impl Renderer) {
        self.renderers.insert(name.into(), Arc::new(renderer));
    }

    /// Adds a variable visible to every template.
    pub fn extra_var(&mut self, name: impl Into<String>, value: Value) {
        self.extra_vars.insert(name.into(), value);
    }

    /// Returns `true` if a renderer is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Renders `data` through the renderer `template` selects.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Configuration`] if the selected renderer is not
    ///   registered.
    /// - [`DispatchError::Upstream`] if rendering or JSON serialization
    ///   fails.
    pub fn render(
        &self,
        template: &str,
        data: &Value,
        helpers: &TemplateHelpers,
        default_renderer: &str,
        template_path: &str,
    ) -> DispatchResult<Body> {
        if template == JSON_TEMPLATE {
            return serde_json::to_string(data)
                .map(Body::Text)
                .map_err(DispatchError::upstream);
        }

        let (name, template) = template
            .split_once(':')
            .unwrap_or((default_renderer, template));

        let renderer = self.renderers.get(name).ok_or_else(|| {
            DispatchError::configuration(format!("no renderer registered as '{name}'"))
        })?;

        tracing::trace!(renderer = name, template, "rendering template");
        renderer
            .render(RenderRequest {
                template,
                data,
                extra_vars: &self.extra_vars,
                helpers,
                template_path,
            })
            .map_err(DispatchError::upstream)
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.renderers.keys().collect();
        names.sort();
        f.debug_struct("RendererRegistry")
            .field("renderers", &names)
            .field("extra_vars", &self.extra_vars)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Renders `template|data|extra vars|error for "name"`.
    struct Echo;

    impl Renderer for Echo {
        fn render(&self, request: RenderRequest<'_>) -> Result<Body, RenderError> {
            if request.template == "missing.html" {
                return Err(RenderError::TemplateNotFound(request.template.into()));
            }
            Ok(Body::Text(format!(
                "{}|{}|{}|{}|{}",
                request.template,
                request.data,
                Value::Object(request.extra_vars.clone()),
                request.helpers.error_for("name"),
                request.template_path,
            )))
        }
    }

    fn registry() -> RendererRegistry {
        let mut registry = RendererRegistry::new();
        registry.register("default", Echo);
        registry.register("mako", Echo);
        registry.extra_var("site", json!("arbor"));
        registry
    }

    fn text(body: Body) -> String {
        body.as_text().unwrap().to_string()
    }

    #[test]
    fn test_json_template_serializes() {
        let body = registry()
            .render("json", &json!({"a": 1}), &TemplateHelpers::default(), "default", "t")
            .unwrap();
        assert_eq!(text(body), r#"{"a":1}"#);
    }

    #[test]
    fn test_default_renderer() {
        let helpers = TemplateHelpers::new(FieldErrors::from_iter([("name", "required")]));
        let body = registry()
            .render("page.html", &json!({"x": 1}), &helpers, "default", "templates")
            .unwrap();
        assert_eq!(
            text(body),
            r#"page.html|{"x":1}|{"site":"arbor"}|required|templates"#
        );
    }

    #[test]
    fn test_prefix_selects_renderer() {
        let body = registry()
            .render("mako:page.html", &json!(null), &TemplateHelpers::default(), "other", "t")
            .unwrap();
        assert!(text(body).starts_with("page.html|null|"));
    }

    #[test]
    fn test_unknown_renderer_is_configuration_error() {
        let err = registry()
            .render("genshi:page.html", &json!(null), &TemplateHelpers::default(), "default", "t")
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_renderer_failure_is_upstream() {
        let err = registry()
            .render("missing.html", &json!(null), &TemplateHelpers::default(), "default", "t")
            .unwrap_err();
        assert_eq!(err.category(), arbor_core::ErrorCategory::Upstream);
        assert!(err.to_string().contains("missing.html"));
    }

    #[test]
    fn test_sticky_drains_once() {
        let helpers = TemplateHelpers::default();
        helpers.sticky("a", json!(1));
        helpers.sticky("b", json!(2));
        assert_eq!(helpers.take_sticky().len(), 2);
        assert!(helpers.take_sticky().is_empty());
    }
}
