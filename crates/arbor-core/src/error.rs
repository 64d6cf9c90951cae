//! Error types for Arbor.
//!
//! [`DispatchError`] is the failure type used by resolution, argument
//! binding, hooks and handler invocation. The dispatcher treats its variants
//! according to their [`ErrorCategory`]:
//!
//! | Category | Variants | Dispatcher treatment |
//! |---|---|---|
//! | status-bearing | `NotFound`, `Http`, `Redirect` | become the response |
//! | forward | `Forward` | replay the request at another path |
//! | fatal | `Configuration`, `Invocation`, `Upstream` | propagate to the caller |
//!
//! The [`abort`] and [`redirect`] primitives build the status-bearing and
//! forward variants from handler or hook code.

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`DispatchError`].
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Categories of dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No route or argument match.
    NotFound,
    /// An explicit abort with an HTTP status.
    Http,
    /// A network redirect.
    Redirect,
    /// An internal, same-request forward.
    Forward,
    /// The application itself is misconfigured.
    Configuration,
    /// A handler could not be called with the bound arguments.
    Invocation,
    /// A handler, hook or renderer failed.
    Upstream,
}

impl ErrorCategory {
    /// Returns `true` for categories that carry an HTTP status and become
    /// the response.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::NotFound | Self::Http | Self::Redirect)
    }
}

/// An internal forward target.
///
/// A forward is not a network round trip: the dispatcher replays the same
/// request from routing with its path replaced by `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forward {
    location: String,
    replay_as_get: bool,
    errors: FieldErrors,
}

impl Forward {
    /// Creates a forward that keeps the original method and body.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            replay_as_get: false,
            errors: FieldErrors::new(),
        }
    }

    /// Creates a forward issued after a validation failure.
    ///
    /// The replayed request is a `GET` and carries the validation errors
    /// and refill parameters of the failed cycle.
    #[must_use]
    pub fn after_validation(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            replay_as_get: true,
            errors: FieldErrors::new(),
        }
    }

    /// Attaches field errors to report on the replayed page.
    ///
    /// The errors are merged with any the failed cycle already recorded,
    /// and the request parameters are kept for form refill.
    ///
    /// ```
    /// use arbor_core::{FieldErrors, Forward};
    ///
    /// let forward = Forward::after_validation("/signup")
    ///     .with_errors(FieldErrors::from_iter([("email", "already registered")]));
    /// assert_eq!(forward.errors().get("email"), Some("already registered"));
    /// ```
    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    /// Returns the forward location (path plus optional query string).
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns `true` if the replay is a validation-error replay.
    #[must_use]
    pub const fn replays_as_get(&self) -> bool {
        self.replay_as_get
    }

    /// Returns the field errors attached with [`with_errors`](Self::with_errors).
    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }
}

/// Standard error type for Arbor.
///
/// # Example
///
/// ```
/// use arbor_core::{DispatchError, ErrorCategory};
/// use http::StatusCode;
///
/// let err = DispatchError::not_found("no handler for /missing");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
/// ```
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No handler could be reached, or the remainder could not be bound.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The request was aborted with an explicit status.
    #[error("HTTP {status}: {detail}")]
    Http {
        /// The response status.
        status: StatusCode,
        /// Human-readable detail.
        detail: String,
    },

    /// The client must be redirected.
    #[error("Redirect ({status}) to {location}")]
    Redirect {
        /// Target of the `Location` header.
        location: String,
        /// A 3xx status.
        status: StatusCode,
    },

    /// The request must be replayed internally at another path.
    #[error("Internal forward to {}", .0.location())]
    Forward(Forward),

    /// The application is misconfigured. Never retried.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// A handler could not be called with the bound arguments.
    #[error("Invocation of '{handler}' failed: {message}")]
    Invocation {
        /// Name of the handler.
        handler: String,
        /// Human-readable error message.
        message: String,
    },

    /// A handler body, hook or renderer failed.
    #[error("Upstream failure: {message}")]
    Upstream {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DispatchError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a status error with a detail message.
    #[must_use]
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http {
            status,
            detail: detail.into(),
        }
    }

    /// Creates a `400 Bad Request` error.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, detail)
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an invocation error for the named handler.
    #[must_use]
    pub fn invocation(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Wraps an arbitrary error raised by user code.
    pub fn upstream(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self::Upstream {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates an upstream error from a message only.
    #[must_use]
    pub fn upstream_message(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Redirect { .. } => ErrorCategory::Redirect,
            Self::Forward(_) => ErrorCategory::Forward,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Invocation { .. } => ErrorCategory::Invocation,
            Self::Upstream { .. } => ErrorCategory::Upstream,
        }
    }

    /// Returns the HTTP status this error becomes, if it is status-bearing.
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Http { status, .. } | Self::Redirect { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the dispatcher turns this error into a response.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        self.category().is_status()
    }

    /// Returns `true` for [`DispatchError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for configuration errors, which must never be retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Fails the request with a specific HTTP status.
///
/// `404` produces [`DispatchError::NotFound`] so that resolver salvage
/// (lookup and default handlers) treats it like any other miss.
#[must_use]
pub fn abort(status: StatusCode) -> DispatchError {
    let detail = status.canonical_reason().unwrap_or("aborted");
    abort_with_detail(status, detail)
}

/// Fails the request with a status and a detail message.
#[must_use]
pub fn abort_with_detail(status: StatusCode, detail: impl Into<String>) -> DispatchError {
    if status == StatusCode::NOT_FOUND {
        DispatchError::not_found(detail)
    } else {
        DispatchError::http(status, detail)
    }
}

/// Redirects the request.
///
/// With `internal` set the dispatcher replays the request at `location`
/// without a network round trip. An internal redirect cannot carry a status
/// code, and a network redirect code must be a 3xx. Both mistakes are
/// configuration errors.
///
/// # Example
///
/// ```
/// use arbor_core::{redirect, DispatchError};
/// use http::StatusCode;
///
/// let err = redirect("/login", false, None);
/// assert_eq!(err.status_code(), Some(StatusCode::FOUND));
///
/// let err = redirect("/login", true, Some(StatusCode::MOVED_PERMANENTLY));
/// assert!(err.is_fatal());
/// ```
#[must_use]
pub fn redirect(
    location: impl Into<String>,
    internal: bool,
    code: Option<StatusCode>,
) -> DispatchError {
    let location = location.into();
    if internal {
        if let Some(code) = code {
            return DispatchError::configuration(format!(
                "internal redirect to '{location}' cannot carry status {code}"
            ));
        }
        return DispatchError::Forward(Forward::new(location));
    }

    let status = code.unwrap_or(StatusCode::FOUND);
    if !status.is_redirection() {
        return DispatchError::configuration(format!(
            "redirect to '{location}' requires a 3xx status, got {status}"
        ));
    }
    DispatchError::Redirect { location, status }
}

/// Field-level validation errors, keyed by field name in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    /// Creates an empty set of field errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for a field, replacing any earlier message.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Returns the error recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Returns `true` if no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Adds every error of `other`, replacing messages for shared fields.
    pub fn merge(&mut self, other: &Self) {
        for (field, message) in other.iter() {
            self.insert(field, message);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        assert!(DispatchError::not_found("x").is_status());
        assert!(abort(StatusCode::FORBIDDEN).is_status());
        assert!(redirect("/a/", false, None).is_status());
        assert!(!DispatchError::configuration("x").is_status());
        assert!(!DispatchError::upstream_message("boom").is_status());
        assert!(!redirect("/a", true, None).is_status());
    }

    #[test]
    fn test_abort_404_is_not_found() {
        let err = abort(StatusCode::NOT_FOUND);
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_abort_carries_status() {
        let err = abort(StatusCode::UNAUTHORIZED);
        assert_eq!(err.category(), ErrorCategory::Http);
        assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_redirect_defaults_to_found() {
        match redirect("/next", false, None) {
            DispatchError::Redirect { location, status } => {
                assert_eq!(location, "/next");
                assert_eq!(status, StatusCode::FOUND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_redirect_rejects_non_3xx() {
        assert!(redirect("/next", false, Some(StatusCode::OK)).is_fatal());
    }

    #[test]
    fn test_internal_redirect_with_code_is_fatal() {
        let err = redirect("/next", true, Some(StatusCode::MOVED_PERMANENTLY));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_internal_redirect_is_forward() {
        match redirect("/next?a=1", true, None) {
            DispatchError::Forward(forward) => {
                assert_eq!(forward.location(), "/next?a=1");
                assert!(!forward.replays_as_get());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_forward_carries_attached_errors() {
        let forward = Forward::after_validation("/signup")
            .with_errors(FieldErrors::from_iter([("email", "taken")]));
        assert!(forward.replays_as_get());
        assert_eq!(forward.errors().get("email"), Some("taken"));
        assert!(Forward::new("/a").errors().is_empty());
    }

    #[test]
    fn test_field_errors_merge_replaces_shared_fields() {
        let mut errors = FieldErrors::from_iter([("email", "required"), ("name", "too short")]);
        errors.merge(&FieldErrors::from_iter([("email", "taken"), ("age", "not a number")]));
        let fields: Vec<_> = errors.iter().collect();
        assert_eq!(
            fields,
            vec![("email", "taken"), ("name", "too short"), ("age", "not a number")]
        );
    }

    #[test]
    fn test_upstream_keeps_source() {
        let err = DispatchError::upstream(anyhow::anyhow!("database down"));
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn test_field_errors_preserve_order() {
        let mut errors = FieldErrors::new();
        errors.insert("zeta", "required");
        errors.insert("alpha", "too short");
        let fields: Vec<_> = errors.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["zeta", "alpha"]);
        assert_eq!(errors.get("alpha"), Some("too short"));
        assert_eq!(errors.len(), 2);
    }
}
