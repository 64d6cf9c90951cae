//! Parameter validation.
//!
//! Runs a handler's [`Validation`] against the request and decides what the
//! handler is called with:
//!
//! ```text
//!   params / JSON body ──► variable_decode? ──► Schema::validate
//!                                                  │
//!                        ┌────────── ok ───────────┴──────── err ─────────┐
//!                        ▼                                                ▼
//!              cleaned object replaces               errors + refill params stored
//!              the params                            │
//!                                                    ├─ error handler ─► Forward (GET replay)
//!                                                    └─ none ─────────► original params
//! ```

use arbor_core::{
    DispatchError, DispatchResult, DispatchState, Forward, Handler, Params, Validation,
};
use arbor_extract::variable_decode;
use arbor_telemetry::metrics::record_validation_failure;
use serde_json::Value;

/// Validates `params` for `handler` and returns the parameters to bind.
///
/// # Errors
///
/// - `400 Bad Request` if a JSON body is malformed or a parameter name
///   nests too deeply to decode.
/// - [`DispatchError::Forward`] if the input is rejected and an error
///   handler is configured.
/// - [`DispatchError::Configuration`] if a form schema does not produce an
///   object.
pub(crate) fn validate(
    handler: &Handler,
    validation: &Validation,
    params: Params,
    state: &mut DispatchState,
) -> DispatchResult<Params> {
    let input = if validation.is_json() {
        serde_json::from_slice::<Value>(state.request().body())
            .map_err(|e| DispatchError::bad_request(format!("malformed JSON body: {e}")))?
    } else {
        Value::Object(params.clone().into_iter().collect())
    };

    let input = match (validation.decode_options(), input) {
        (Some(options), Value::Object(map)) => {
            variable_decode(&map.into_iter().collect(), &options)?
        }
        (_, input) => input,
    };

    match validation.schema().validate(&input) {
        Ok(clean) if validation.is_json() => Ok(wrap_data(clean)),
        Ok(Value::Object(clean)) => Ok(clean.into_iter().collect()),
        Ok(other) => Err(DispatchError::configuration(format!(
            "schema of '{}' produced {} instead of an object",
            handler.name(),
            kind_of(&other)
        ))),
        Err(errors) => {
            record_validation_failure(handler.name());
            tracing::debug!(
                handler = handler.name(),
                fields = errors.len(),
                "validation rejected the request"
            );

            let ctx = state.context_mut();
            ctx.set_validation_errors(errors);
            ctx.refill_params_or_insert(|| params.clone());
            if let Some(options) = validation.fill_options_ref() {
                ctx.set_fill_options(options.clone());
            }

            if let Some(error_handler) = validation.error_handler_ref() {
                let location = error_handler.location(state.context());
                return Err(DispatchError::Forward(Forward::after_validation(location)));
            }

            if validation.is_json() {
                Ok(wrap_data(Value::Object(params.into_iter().collect())))
            } else {
                Ok(params)
            }
        }
    }
}

fn wrap_data(value: Value) -> Params {
    let mut params = Params::new();
    params.insert("data".to_string(), value);
    params
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{DecodeOptions, FieldErrors, Reply, Request, RequestContext};
    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Method};
    use serde_json::json;

    fn handler() -> Handler {
        Handler::new("save", |_| async { Ok(Reply::text("ok")) })
    }

    fn state(request: Request) -> DispatchState {
        DispatchState::new(request, RequestContext::new())
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    fn require_name(input: &Value) -> Result<Value, FieldErrors> {
        match input.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => Ok(json!({"name": name.to_uppercase()})),
            _ => Err(FieldErrors::from_iter([("name", "Please enter a value")])),
        }
    }

    #[test]
    fn test_success_replaces_params() {
        let validation = Validation::new(require_name);
        let mut state = state(Request::new(Method::POST, "/save"));
        let out = validate(&handler(), &validation, params(&[("name", "ada"), ("x", "1")]), &mut state)
            .unwrap();
        assert_eq!(out, params(&[("name", "ADA")]));
        assert!(state.context().validation_errors().is_empty());
    }

    #[test]
    fn test_failure_without_error_handler_keeps_params() {
        let validation = Validation::new(require_name).fill_options(json!({"prefix": "err"}));
        let mut state = state(Request::new(Method::POST, "/save"));
        let input = params(&[("name", "")]);
        let out = validate(&handler(), &validation, input.clone(), &mut state).unwrap();

        assert_eq!(out, input);
        let ctx = state.context();
        assert_eq!(ctx.validation_errors().get("name"), Some("Please enter a value"));
        assert_eq!(ctx.refill_params(), Some(&input));
        assert_eq!(ctx.fill_options(), Some(&json!({"prefix": "err"})));
    }

    #[test]
    fn test_failure_with_error_handler_forwards() {
        let validation = Validation::new(require_name).error_handler("/form");
        let mut state = state(Request::new(Method::POST, "/save"));
        let err = validate(&handler(), &validation, Params::new(), &mut state).unwrap_err();

        match err {
            DispatchError::Forward(forward) => {
                assert_eq!(forward.location(), "/form");
                assert!(forward.replays_as_get());
            }
            other => panic!("expected a forward, got {other:?}"),
        }
        assert_eq!(state.context().validation_errors().len(), 1);
    }

    #[test]
    fn test_dynamic_error_handler_location() {
        let validation = Validation::new(require_name)
            .error_handler_fn(|ctx| format!("{}/edit", ctx.routing_path()));
        let mut state = state(Request::new(Method::POST, "/users/7"));
        state.context_mut().set_routing_path("/users/7");
        let err = validate(&handler(), &validation, Params::new(), &mut state).unwrap_err();
        assert!(matches!(err, DispatchError::Forward(f) if f.location() == "/users/7/edit"));
    }

    #[test]
    fn test_json_body_is_wrapped() {
        let validation = Validation::new(require_name).json();
        let request = Request::new(Method::POST, "/save")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"name": "ada"}"#);
        let mut state = state(request);
        let out = validate(&handler(), &validation, Params::new(), &mut state).unwrap();
        assert_eq!(out.get("data"), Some(&json!({"name": "ADA"})));
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let validation = Validation::new(require_name).json();
        let request = Request::new(Method::POST, "/save").with_body("{not json");
        let mut state = state(request);
        let err = validate(&handler(), &validation, Params::new(), &mut state).unwrap_err();
        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_variable_decode_before_schema() {
        let validation = Validation::new(|input: &Value| -> Result<Value, FieldErrors> {
            Ok(input.clone())
        })
        .variable_decode(DecodeOptions::default());
        let mut state = state(Request::new(Method::POST, "/save"));
        let out = validate(
            &handler(),
            &validation,
            params(&[("address.city", "Oslo"), ("tags-0", "a"), ("tags-1", "b")]),
            &mut state,
        )
        .unwrap();
        assert_eq!(out.get("address"), Some(&json!({"city": "Oslo"})));
        assert_eq!(out.get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_over_deep_parameter_name_is_bad_request() {
        let validation = Validation::new(|input: &Value| -> Result<Value, FieldErrors> {
            Ok(input.clone())
        })
        .variable_decode(DecodeOptions::default());
        let key = vec!["a"; 100_000].join(".");
        let mut state = state(Request::new(Method::POST, "/save"));
        let err = validate(&handler(), &validation, params(&[(key.as_str(), "x")]), &mut state)
            .unwrap_err();
        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_REQUEST));
        assert!(state.context().validation_errors().is_empty());
    }

    #[test]
    fn test_non_object_result_is_configuration_error() {
        let validation =
            Validation::new(|_: &Value| -> Result<Value, FieldErrors> { Ok(json!([1, 2])) });
        let mut state = state(Request::new(Method::POST, "/save"));
        let err = validate(&handler(), &validation, Params::new(), &mut state).unwrap_err();
        assert!(err.is_fatal());
    }
}
