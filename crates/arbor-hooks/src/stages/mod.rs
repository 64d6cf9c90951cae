//! Built-in hooks.
//!
//! - [`request_log`] - structured log line per dispatch

pub mod request_log;

pub use request_log::RequestLogHook;
