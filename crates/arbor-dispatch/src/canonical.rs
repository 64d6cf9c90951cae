//! Trailing-slash canonicalization.

use arbor_core::Request;
use http::Method;

/// Returns `true` for methods a client may repeat after a redirect without
/// losing data.
#[must_use]
pub fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Builds the canonical location for `request`: its path with a trailing
/// slash, the query string kept.
///
/// The location is absolute when the request names a host, using the scheme
/// a fronting proxy reported.
///
/// ```
/// use arbor_core::Request;
/// use arbor_dispatch::canonical::location;
/// use http::{header::HOST, HeaderValue, Method};
///
/// let request = Request::new(Method::GET, "/child?page=2")
///     .with_header(HOST, HeaderValue::from_static("localhost"))
///     .with_header("x-forwarded-proto".parse().unwrap(), HeaderValue::from_static("https"));
/// assert_eq!(location(&request), "https://localhost/child/?page=2");
/// ```
#[must_use]
pub fn location(request: &Request) -> String {
    let path: Vec<String> = request
        .path()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    let mut location = match request.host() {
        Some(host) => format!("{}://{host}", request.scheme()),
        None => String::new(),
    };
    location.push_str(&path.join("/"));
    location.push('/');
    if let Some(query) = request.query_string().filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(query);
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HOST;
    use http::HeaderValue;

    #[test]
    fn test_safe_methods() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::DELETE));
    }

    #[test]
    fn test_relative_location_without_host() {
        let request = Request::new(Method::GET, "/child");
        assert_eq!(location(&request), "/child/");
    }

    #[test]
    fn test_location_defaults_to_http() {
        let request = Request::new(Method::GET, "/child?x=1&y=2")
            .with_header(HOST, HeaderValue::from_static("example.com:8080"));
        assert_eq!(location(&request), "http://example.com:8080/child/?x=1&y=2");
    }

    #[test]
    fn test_location_reencodes_path() {
        let request = Request::new(Method::GET, "/caf%C3%A9/a%20b");
        assert_eq!(location(&request), "/caf%C3%A9/a%20b/");
    }

    #[test]
    fn test_empty_path_redirects_to_root() {
        let request =
            Request::new(Method::GET, "").with_header(HOST, HeaderValue::from_static("localhost"));
        assert_eq!(location(&request), "http://localhost/");
    }
}
