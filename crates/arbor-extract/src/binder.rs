//! Mapping the path remainder and request params onto a signature.

use arbor_core::{Arguments, DispatchError, DispatchResult, Params, RequestContext, Signature};
use serde_json::Value;

/// Binds arguments for a handler.
///
/// The rules, in order:
///
/// 1. Routing arguments stashed in the context by a lookup are taken and
///    prepended to `remainder`. A trailing empty segment (from a trailing
///    slash) is dropped; empty segments inside the path are kept.
/// 2. Remainder segments fill the declared parameters from the left.
/// 3. Segments left over are appended as variadic arguments, or the request
///    fails with `NotFound` if the signature has no variadic capture.
/// 4. Parameters still unfilled take their value from `params`, then from
///    their default. Filling stops at the first parameter with neither, so
///    the call itself reports the missing argument.
/// 5. With a variadic keyword capture, every remaining param that is not a
///    declared parameter becomes a keyword argument.
///
/// # Errors
///
/// Returns [`DispatchError::NotFound`] when the remainder cannot be absorbed.
///
/// # Example
///
/// ```
/// use arbor_core::{Params, RequestContext, Signature};
/// use arbor_extract::bind;
/// use serde_json::json;
///
/// let signature = Signature::new().param("year").param("month").varkw();
/// let mut params = Params::new();
/// params.insert("month".into(), json!("05"));
/// params.insert("lang".into(), json!("en"));
///
/// let args = bind(&signature, &["2024".into()], params, &mut RequestContext::new()).unwrap();
/// assert_eq!(args.positional(), [json!("2024"), json!("05")]);
/// assert_eq!(args.keyword().get("lang"), Some(&json!("en")));
/// ```
pub fn bind(
    signature: &Signature,
    remainder: &[String],
    mut params: Params,
    ctx: &mut RequestContext,
) -> DispatchResult<Arguments> {
    let mut segments: Vec<String> = ctx.take_routing_args().unwrap_or_default();
    segments.extend(remainder.iter().cloned());
    if segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }

    let declared = signature.params();
    let consumed = segments.len().min(declared.len());
    let mut positional: Vec<Value> = segments
        .drain(..consumed)
        .map(Value::String)
        .collect();

    if !segments.is_empty() {
        if !signature.accepts_varargs() {
            return Err(DispatchError::not_found(format!(
                "{} unexpected path segment(s)",
                segments.len()
            )));
        }
        positional.extend(segments.into_iter().map(Value::String));
    }

    for name in &declared[consumed..] {
        if let Some(value) = params.shift_remove(name) {
            positional.push(value);
        } else if let Some(default) = signature.default_for(name) {
            positional.push(default.clone());
        } else {
            tracing::trace!(param = %name, "no value for parameter");
            break;
        }
    }

    let keyword = if signature.accepts_varkw() {
        params
            .into_iter()
            .filter(|(name, _)| !signature.declares(name))
            .collect()
    } else {
        Params::new()
    };

    Ok(Arguments::new(positional, keyword))
}
