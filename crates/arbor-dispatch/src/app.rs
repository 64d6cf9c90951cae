//! The application: a handler tree plus everything dispatch needs.

use crate::render::{FormFiller, Renderer, RendererRegistry};
use arbor_config::{ArborConfig, ConfigError, DispatchConfig};
use arbor_core::Hook;
use arbor_router::HandlerNode;
use http::StatusCode;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A dispatchable application.
///
/// Everything in an `Application` is read-only once built, so one instance
/// serves any number of concurrent dispatches behind an `Arc`.
///
/// # Example
///
/// ```
/// use arbor_core::{Handler, Reply};
/// use arbor_dispatch::Application;
/// use arbor_router::HandlerNode;
///
/// let root = HandlerNode::new("root")
///     .with_index(Handler::new("index", |_| async { Ok(Reply::text("hello")) }));
///
/// let app = Application::builder(root).build().unwrap();
/// assert!(app.config().force_canonical);
/// ```
pub struct Application {
    pub(crate) root: Arc<HandlerNode>,
    pub(crate) hooks: Vec<Arc<dyn Hook>>,
    pub(crate) renderers: RendererRegistry,
    pub(crate) filler: Option<Arc<dyn FormFiller>>,
    pub(crate) config: DispatchConfig,
    pub(crate) redirect_status: StatusCode,
}

impl Application {
    /// Starts building an application around `root`.
    #[must_use]
    pub fn builder(root: impl Into<Arc<HandlerNode>>) -> ApplicationBuilder {
        ApplicationBuilder::new(root.into())
    }

    /// Returns the root of the handler tree.
    #[must_use]
    pub const fn root(&self) -> &Arc<HandlerNode> {
        &self.root
    }

    /// Returns the application-level hooks.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the renderer registry.
    #[must_use]
    pub const fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    /// Returns the dispatch configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("root", &self.root.name())
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("renderers", &self.renderers)
            .field("form_filler", &self.filler.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`Application`].
#[must_use]
pub struct ApplicationBuilder {
    root: Arc<HandlerNode>,
    hooks: Vec<Arc<dyn Hook>>,
    renderers: RendererRegistry,
    filler: Option<Arc<dyn FormFiller>>,
    config: ArborConfig,
}

impl ApplicationBuilder {
    fn new(root: Arc<HandlerNode>) -> Self {
        Self {
            root,
            hooks: Vec::new(),
            renderers: RendererRegistry::new(),
            filler: None,
            config: ArborConfig::default(),
        }
    }

    /// Adds an application-level hook, applied to every request.
    pub fn hook(mut self, hook: impl Hook) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Registers a renderer under `name`.
    pub fn renderer(mut self, name: impl Into<String>, renderer: impl Renderer) -> Self {
        self.renderers.register(name, renderer);
        self
    }

    /// Adds a variable visible to every rendered template.
    pub fn extra_template_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.renderers.extra_var(name, value);
        self
    }

    /// Sets the form filler used to refill rejected forms.
    pub fn form_filler(mut self, filler: impl FormFiller) -> Self {
        self.filler = Some(Arc::new(filler));
        self
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: ArborConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables trailing-slash redirects.
    pub fn force_canonical(mut self, enabled: bool) -> Self {
        self.config.dispatch.force_canonical = enabled;
        self
    }

    /// Builds the application.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn build(self) -> Result<Application, ConfigError> {
        self.config.validate()?;
        let dispatch = self.config.dispatch;
        let redirect_status = StatusCode::from_u16(dispatch.canonical_redirect_code).map_err(|e| {
            ConfigError::invalid_value("dispatch.canonical_redirect_code", e.to_string())
        })?;

        tracing::debug!(
            root = self.root.name(),
            hooks = self.hooks.len(),
            force_canonical = dispatch.force_canonical,
            "application built"
        );

        Ok(Application {
            root: self.root,
            hooks: self.hooks,
            renderers: self.renderers,
            filler: self.filler,
            config: dispatch,
            redirect_status,
        })
    }
}
