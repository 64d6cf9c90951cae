//! Test error types.

use arbor_core::DispatchError;
use std::fmt;

/// Errors that can occur during testing.
#[derive(Debug)]
pub enum TestError {
    /// Request building failed
    RequestBuild(String),
    /// The dispatcher returned an error instead of a response
    Dispatch(DispatchError),
    /// Response body was not what the caller asked for
    BodyRead(String),
    /// JSON serialization/deserialization failed
    Json(serde_json::Error),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestBuild(msg) => write!(f, "Request build error: {msg}"),
            Self::Dispatch(e) => write!(f, "Dispatch error: {e}"),
            Self::BodyRead(msg) => write!(f, "Body read error: {msg}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dispatch(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<DispatchError> for TestError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl TestError {
    /// Returns the dispatch error, if the dispatcher failed.
    #[must_use]
    pub const fn as_dispatch(&self) -> Option<&DispatchError> {
        match self {
            Self::Dispatch(e) => Some(e),
            _ => None,
        }
    }
}
