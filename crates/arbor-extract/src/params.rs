//! Query string and form body parameters.

use arbor_core::{DispatchError, DispatchResult, ParamPrecedence, Params, Request};
use serde_json::Value;
use std::collections::HashSet;

/// Merges the query string and an url-encoded form body into one map.
///
/// Keys keep their first-seen position: query keys first, then keys that
/// only the form supplies. A key repeated within one source keeps its last
/// value. When both sources name a key, `precedence` decides which value
/// survives.
///
/// # Errors
///
/// Fails with `400 Bad Request` if either source is not valid
/// `application/x-www-form-urlencoded` data.
///
/// # Example
///
/// ```
/// use arbor_core::{ParamPrecedence, Request};
/// use arbor_extract::merge_params;
/// use http::header::CONTENT_TYPE;
/// use http::{HeaderValue, Method};
///
/// let request = Request::new(Method::POST, "/save?name=query&page=2")
///     .with_header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
///     .with_body("name=form");
///
/// let params = merge_params(&request, ParamPrecedence::FormWins).unwrap();
/// assert_eq!(params["name"], "form");
///
/// let params = merge_params(&request, ParamPrecedence::QueryWins).unwrap();
/// assert_eq!(params["name"], "query");
/// ```
pub fn merge_params(request: &Request, precedence: ParamPrecedence) -> DispatchResult<Params> {
    let query = match request.query_string() {
        Some(query) => parse_pairs(query.as_bytes(), "query string")?,
        None => Vec::new(),
    };
    let form = if request.has_form_body() {
        parse_pairs(request.body(), "form body")?
    } else {
        Vec::new()
    };

    let mut params = Params::with_capacity(query.len() + form.len());
    let query_keys: HashSet<String> = query.iter().map(|(k, _)| k.clone()).collect();

    for (key, value) in query {
        params.insert(key, Value::String(value));
    }
    for (key, value) in form {
        if precedence == ParamPrecedence::QueryWins && query_keys.contains(&key) {
            continue;
        }
        params.insert(key, Value::String(value));
    }

    Ok(params)
}

fn parse_pairs(input: &[u8], source: &str) -> DispatchResult<Vec<(String, String)>> {
    serde_urlencoded::from_bytes(input)
        .map_err(|e| DispatchError::bad_request(format!("malformed {source}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Method};

    fn form_post(target: &str, body: &'static str) -> Request {
        Request::new(Method::POST, target)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
            )
            .with_body(body)
    }

    fn keys(params: &Params) -> Vec<&str> {
        params.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_query_only() {
        let request = Request::new(Method::GET, "/?b=2&a=1&text=hello+world");
        let params = merge_params(&request, ParamPrecedence::default()).unwrap();
        assert_eq!(keys(&params), ["b", "a", "text"]);
        assert_eq!(params["text"], "hello world");
    }

    #[test]
    fn test_query_keys_precede_form_keys() {
        let request = form_post("/?q=1", "f=2&q=3");
        let params = merge_params(&request, ParamPrecedence::FormWins).unwrap();
        assert_eq!(keys(&params), ["q", "f"]);
        assert_eq!(params["q"], "3");
    }

    #[test]
    fn test_query_wins() {
        let request = form_post("/?q=1", "f=2&q=3");
        let params = merge_params(&request, ParamPrecedence::QueryWins).unwrap();
        assert_eq!(params["q"], "1");
        assert_eq!(params["f"], "2");
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let request = Request::new(Method::GET, "/?tag=a&tag=b");
        let params = merge_params(&request, ParamPrecedence::default()).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["tag"], "b");
    }

    #[test]
    fn test_non_form_body_is_ignored() {
        let request = Request::new(Method::POST, "/")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"a": 1}"#);
        assert!(merge_params(&request, ParamPrecedence::default())
            .unwrap()
            .is_empty());
    }
}
