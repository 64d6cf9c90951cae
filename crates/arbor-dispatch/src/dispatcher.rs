//! The dispatch state machine.
//!
//! One dispatch cycle walks these states:
//!
//! ```text
//! ROUTING ─► CONTENT_TYPE ─► BEFORE_HOOKS ─► VALIDATION ─► BINDING ─► INVOKE
//!                                                                       │
//!          RESPONSE_FINALIZE ◄─ POST_PROCESS (form refill) ◄─ RENDER ◄──┘
//! ```
//!
//! After-hooks run on every exit path. On-error hooks run on every failure
//! except an internal forward, which ends the cycle with a replay instead:
//! the outer loop rewrites the request and starts a fresh cycle from
//! routing, up to `max_forwards` times. A forward raised by an after or
//! on-error hook replays the same way.

use crate::app::Application;
use crate::canonical;
use crate::negotiation;
use crate::render::TemplateHelpers;
use crate::validation;
use arbor_core::{
    abort, Body, DispatchError, DispatchResult, DispatchState, FieldErrors, Forward, Handler,
    Invocation, Output, Params, Request, RequestContext, RequestId, Response, Validation,
    APPLICATION_JSON, JSON_TEMPLATE, TEXT_HTML,
};
use arbor_extract::{bind, merge_params};
use arbor_hooks::{compute_hooks, HookEvent, HookPipeline};
use arbor_router::{resolve, split_path, ResolutionResult};
use arbor_telemetry::metrics::{record_dispatch, record_forward, InFlightGuard};
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

/// How a dispatch cycle ended.
enum Step {
    /// The cycle produced a response.
    Done(Response),
    /// The cycle asked for an internal forward.
    Replay {
        forward: Forward,
        request: Request,
        carry: Option<Carry>,
    },
}

/// State a validation forward hands to the replayed cycle.
#[derive(Debug, Default)]
struct Carry {
    errors: FieldErrors,
    refill_params: Option<Params>,
    fill_options: Option<Value>,
}

impl Carry {
    fn from_context(ctx: &RequestContext) -> Self {
        Self {
            errors: ctx.validation_errors().clone(),
            refill_params: ctx.refill_params().cloned(),
            fill_options: ctx.fill_options().cloned(),
        }
    }

    /// Seeds a fresh context; the errors are only adopted once the replay
    /// knows its handler.
    fn seed(&mut self, ctx: &mut RequestContext) {
        if let Some(params) = self.refill_params.take() {
            ctx.set_refill_params(params);
        }
        if let Some(options) = self.fill_options.take() {
            ctx.set_fill_options(options);
        }
    }
}

impl Application {
    /// Dispatches a request.
    ///
    /// Status-bearing failures (`NotFound`, aborts, redirects) come back as
    /// `Ok` responses after the on-error hooks ran.
    ///
    /// # Errors
    ///
    /// Returns configuration, invocation and upstream errors, after the
    /// on-error and after hooks ran.
    ///
    /// # Example
    ///
    /// ```
    /// use arbor_core::{Handler, Reply, Request};
    /// use arbor_dispatch::Application;
    /// use arbor_router::HandlerNode;
    /// use http::{Method, StatusCode};
    ///
    /// # tokio_test::block_on(async {
    /// let root = HandlerNode::new("root")
    ///     .with_index(Handler::new("index", |_| async { Ok(Reply::text("hello")) }));
    /// let app = Application::builder(root).build().unwrap();
    ///
    /// let response = app.dispatch(Request::new(Method::GET, "/")).await.unwrap();
    /// assert_eq!(response.status(), StatusCode::OK);
    /// assert_eq!(response.body().as_text(), Some("hello"));
    /// # });
    /// ```
    pub async fn dispatch(&self, request: Request) -> DispatchResult<Response> {
        let _in_flight = InFlightGuard::new();
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
        );
        self.run(request, request_id).instrument(span).await
    }

    /// Dispatches an `http` request and always produces an `http` response
    /// for status-bearing outcomes, including malformed request paths.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn dispatch_http(
        &self,
        request: http::Request<Bytes>,
    ) -> DispatchResult<http::Response<Bytes>> {
        let request = match Request::from_http(request) {
            Ok(request) => request,
            Err(err) => {
                return Response::for_error(&err)
                    .map(Response::into_http)
                    .ok_or(err);
            }
        };
        self.dispatch(request).await.map(Response::into_http)
    }

    async fn run(&self, mut request: Request, request_id: RequestId) -> DispatchResult<Response> {
        let mut carry: Option<Carry> = None;
        let mut forwards = 0usize;

        loop {
            match self.cycle(request, request_id, carry.take()).await? {
                Step::Done(response) => return Ok(response),
                Step::Replay {
                    forward,
                    request: mut replay,
                    carry: next,
                } => {
                    forwards += 1;
                    if forwards > self.config.max_forwards {
                        return Err(DispatchError::configuration(format!(
                            "gave up after {} internal forwards (last to '{}')",
                            self.config.max_forwards,
                            forward.location()
                        )));
                    }
                    record_forward();
                    tracing::debug!(
                        location = forward.location(),
                        replay_as_get = forward.replays_as_get(),
                        forwards,
                        "internal forward"
                    );

                    if forward.replays_as_get() {
                        replay.convert_to_get();
                    }
                    replay.set_location(forward.location());
                    request = replay;
                    carry = next;
                }
            }
        }
    }

    /// Runs one dispatch cycle and its after and on-error hooks.
    async fn cycle(
        &self,
        request: Request,
        request_id: RequestId,
        mut carry: Option<Carry>,
    ) -> DispatchResult<Step> {
        let mut ctx = RequestContext::with_request_id(request_id);
        let carried_errors = carry.as_mut().map(|carry| {
            carry.seed(&mut ctx);
            std::mem::take(&mut carry.errors)
        });

        let mut state = DispatchState::new(request, ctx);
        let mut pipeline = compute_hooks(&self.hooks, &[]);

        let outcome = self
            .handle(&mut state, &mut pipeline, carried_errors)
            .await;

        let mut outcome = match outcome {
            Ok(()) => Ok(None),
            Err(DispatchError::Forward(forward)) => Ok(Some(forward)),
            Err(error) => self.fail(&pipeline, &mut state, error),
        };

        if let Err(after_error) = pipeline.run(HookEvent::After, &mut state) {
            if outcome.is_ok() {
                outcome = self.absorb(&mut state, after_error);
            } else {
                tracing::warn!(
                    error = %after_error,
                    "after hook failed on an already failing request"
                );
            }
        }

        let handler = state
            .handler()
            .map_or_else(|| "-".to_string(), |h| h.name().to_string());
        let elapsed = state.context().elapsed();

        match outcome {
            Ok(Some(forward)) => {
                if !forward.errors().is_empty() {
                    self.adopt_forward_errors(&mut state, forward.errors());
                }
                let carry = forward
                    .replays_as_get()
                    .then(|| Carry::from_context(state.context()));
                let (request, _, _) = state.into_parts();
                Ok(Step::Replay {
                    forward,
                    request,
                    carry,
                })
            }
            Ok(None) => {
                let (_, response, _) = state.into_parts();
                record_dispatch(&handler, response.status().as_u16(), elapsed);
                Ok(Step::Done(response))
            }
            Err(error) => {
                record_dispatch(&handler, StatusCode::INTERNAL_SERVER_ERROR.as_u16(), elapsed);
                Err(error)
            }
        }
    }

    /// Runs the on-error hooks and decides whether `error` becomes the
    /// response.
    fn fail(
        &self,
        pipeline: &HookPipeline,
        state: &mut DispatchState,
        error: DispatchError,
    ) -> DispatchResult<Option<Forward>> {
        if let Some(response) = Response::for_error(&error) {
            state.set_response(response);
        }

        if error.is_status() {
            tracing::debug!(error = %error, category = ?error.category(), "request failed with a status");
        } else {
            tracing::error!(error = %error, category = ?error.category(), "request failed");
        }

        if let Err(hook_error) = pipeline.run(HookEvent::OnError(&error), state) {
            if let DispatchError::Forward(forward) = hook_error {
                return Ok(Some(forward));
            }
            if error.is_status() {
                return self.absorb(state, hook_error);
            }
            tracing::warn!(error = %hook_error, original = %error, "on_error hook failed");
        }

        if error.is_status() {
            Ok(None)
        } else {
            Err(error)
        }
    }

    /// Turns a hook failure on a successful cycle into the outcome.
    fn absorb(
        &self,
        state: &mut DispatchState,
        error: DispatchError,
    ) -> DispatchResult<Option<Forward>> {
        if let DispatchError::Forward(forward) = error {
            return Ok(Some(forward));
        }
        match Response::for_error(&error) {
            Some(response) => {
                state.set_response(response);
                Ok(None)
            }
            None => Err(error),
        }
    }

    /// Records the field errors a forward brought along, with the request
    /// parameters kept for refill.
    fn adopt_forward_errors(&self, state: &mut DispatchState, errors: &FieldErrors) {
        let params = match merge_params(state.request(), self.config.param_precedence) {
            Ok(params) => params,
            Err(error) => {
                tracing::debug!(error = %error, "no refill parameters for the forward");
                Params::new()
            }
        };
        let ctx = state.context_mut();
        let mut merged = ctx.validation_errors().clone();
        merged.merge(errors);
        ctx.set_validation_errors(merged);
        ctx.refill_params_or_insert(|| params);
    }

    /// The state machine proper, from routing to the finished response.
    async fn handle(
        &self,
        state: &mut DispatchState,
        pipeline: &mut HookPipeline,
        carried_errors: Option<FieldErrors>,
    ) -> DispatchResult<()> {
        // ROUTING
        let path = state.request().path().to_string();
        state.context_mut().set_routing_path(path);
        pipeline.run(HookEvent::OnRoute, state)?;

        let mut path = state.context().routing_path().to_string();
        if state.context().content_type().is_none() {
            if let Some(split) = negotiation::split_extension(&path) {
                let content_type = negotiation::content_type_for(&split.extension);
                let ctx = state.context_mut();
                ctx.set_content_type(content_type.map(ToString::to_string));
                ctx.set_extension(split.extension);
                path = split.stem;
            }
        }

        let resolution = resolve(&self.root, &split_path(&path), state.context_mut())?;
        if !resolution.is_canonical() {
            self.enforce_canonical(state, &resolution)?;
        }

        let handler = select_variant(&resolution, state.request());
        tracing::debug!(
            handler = handler.name(),
            remainder = ?resolution.remainder(),
            "resolved handler"
        );
        state.set_handler(Arc::clone(&handler));

        // CONTENT_TYPE
        let exposure = handler.exposure();
        match state.context().content_type() {
            None => {
                let content_type = exposure.content_type().map(ToString::to_string);
                state.context_mut().set_content_type(content_type);
            }
            Some(forced) if exposure.content_type().is_some() && !exposure.allows(forced) => {
                return Err(DispatchError::not_found(format!(
                    "'{}' is not exposed as {forced}",
                    handler.name()
                )));
            }
            Some(_) => {}
        }

        check_guards(&resolution, &handler, state)?;

        // BEFORE_HOOKS
        let mut controller_hooks = resolution.hooks().to_vec();
        if !Arc::ptr_eq(resolution.handler(), &handler) {
            controller_hooks.extend(resolution.handler().hooks().iter().cloned());
        }
        controller_hooks.extend(handler.hooks().iter().cloned());
        *pipeline = compute_hooks(&self.hooks, &controller_hooks);
        pipeline.run(HookEvent::Before, state)?;

        // VALIDATION
        let merged = merge_params(state.request(), self.config.param_precedence)?;
        let params = match handler.validation() {
            Some(rules) => validation::validate(&handler, rules, merged, state)?,
            None => {
                if let Some(errors) = carried_errors {
                    state.context_mut().set_validation_errors(errors);
                }
                merged
            }
        };

        // BINDING
        let signature = handler.declared_signature().clone();
        let args = bind(
            &signature,
            resolution.remainder(),
            params.clone(),
            state.context_mut(),
        )?;

        // INVOKE
        let invocation = Invocation::new(
            signature,
            args,
            state.request().clone(),
            state.context().clone(),
        );
        let reply = handler.call(invocation).await?;
        let (output, reply_template, reply_content_type) = reply.into_parts();

        // RENDER
        let ctx = state.context();
        let mut template = handler
            .exposure()
            .template_for(ctx.content_type())
            .map(ToString::to_string);
        if let Some(overridden) = ctx.override_template() {
            template = overridden.map(ToString::to_string);
        }
        if let Some(overridden) = reply_template {
            template = overridden;
        }
        let mut content_type = ctx
            .override_content_type()
            .or_else(|| ctx.content_type())
            .map(ToString::to_string);
        if let Some(overridden) = reply_content_type {
            content_type = Some(overridden);
        }

        let body = match (output, template.as_deref()) {
            (Output::Response(response), _) => {
                state.set_response(response);
                return Ok(());
            }
            (Output::Text(text), None) => Body::Text(text),
            (Output::Bytes(bytes), None) => Body::Binary(bytes),
            (Output::Data(_), None) => {
                return Err(DispatchError::configuration(format!(
                    "'{}' returned structured data but has no template for {}",
                    handler.name(),
                    content_type.as_deref().unwrap_or("an unspecified content type")
                )));
            }
            (Output::Bytes(_), Some(template)) => {
                return Err(DispatchError::configuration(format!(
                    "'{}' returned bytes, which cannot be rendered with '{template}'",
                    handler.name()
                )));
            }
            (Output::Data(data), Some(template)) => {
                self.render(template, &data, &params, state)?
            }
            (Output::Text(text), Some(template)) => {
                self.render(template, &Value::String(text), &params, state)?
            }
        };
        if template.as_deref() == Some(JSON_TEMPLATE) {
            content_type = Some(APPLICATION_JSON.to_string());
        }
        state.context_mut().set_content_type(content_type.clone());

        // POST_PROCESS
        let body = self.refill(&handler, body, content_type.as_deref(), &params, state)?;

        // RESPONSE_FINALIZE
        let response = state.response_mut();
        response.set_body(body);
        if let Some(content_type) = content_type {
            response.set_content_type(content_type);
        }
        Ok(())
    }

    fn enforce_canonical(
        &self,
        state: &DispatchState,
        resolution: &ResolutionResult,
    ) -> DispatchResult<()> {
        if !self.config.force_canonical || resolution.handler().accepts_noncanonical() {
            return Ok(());
        }

        let request = state.request();
        if !canonical::is_safe(request.method()) {
            return Err(DispatchError::configuration(format!(
                "a {} to '{path}' requires a trailing slash, and clients do not keep the body \
                 when redirected; send it to '{path}/' or disable force_canonical",
                request.method(),
                path = state.context().routing_path(),
            )));
        }

        let location = canonical::location(request);
        tracing::debug!(location = %location, "redirecting to the canonical path");
        Err(DispatchError::Redirect {
            location,
            status: self.redirect_status,
        })
    }

    fn render(
        &self,
        template: &str,
        data: &Value,
        params: &Params,
        state: &mut DispatchState,
    ) -> DispatchResult<Body> {
        let helpers = TemplateHelpers::new(state.context().validation_errors().clone());
        let body = self.renderers.render(
            template,
            data,
            &helpers,
            &self.config.default_renderer,
            &self.config.template_path,
        )?;

        let sticky = helpers.take_sticky();
        if !sticky.is_empty() {
            let refill = state
                .context_mut()
                .refill_params_or_insert(|| params.clone());
            refill.extend(sticky);
        }
        Ok(body)
    }

    /// Refills a rejected form. Runs only for HTML text bodies of requests
    /// with validation errors and fill options, when a filler is set.
    fn refill(
        &self,
        handler: &Handler,
        body: Body,
        content_type: Option<&str>,
        params: &Params,
        state: &DispatchState,
    ) -> DispatchResult<Body> {
        let ctx = state.context();
        let options = handler
            .validation()
            .and_then(Validation::fill_options_ref)
            .or_else(|| ctx.fill_options());

        let (Some(filler), Some(options)) = (self.filler.as_ref(), options) else {
            return Ok(body);
        };
        if ctx.validation_errors().is_empty() || content_type != Some(TEXT_HTML) {
            return Ok(body);
        }

        match body {
            Body::Text(text) => {
                let defaults = ctx.refill_params().unwrap_or(params);
                filler
                    .fill(&text, defaults, ctx.validation_errors(), options)
                    .map(Body::Text)
                    .map_err(DispatchError::upstream)
            }
            other => Ok(other),
        }
    }
}

/// Picks the method variant of a generic handler.
fn select_variant(resolution: &ResolutionResult, request: &Request) -> Arc<Handler> {
    let resolved = resolution.handler();
    match resolved.method_table() {
        Some(table) => Arc::clone(table.select(request.method())),
        None => Arc::clone(resolved),
    }
}

fn check_guards(
    resolution: &ResolutionResult,
    handler: &Arc<Handler>,
    state: &DispatchState,
) -> DispatchResult<()> {
    let variant_guard = handler
        .guard_ref()
        .filter(|_| !Arc::ptr_eq(resolution.handler(), handler));

    let allowed = resolution
        .guards()
        .iter()
        .chain(variant_guard)
        .all(|guard| guard.check(state.request(), state.context()));

    if allowed {
        Ok(())
    } else {
        tracing::debug!(handler = handler.name(), "guard denied access");
        Err(abort(StatusCode::UNAUTHORIZED))
    }
}
