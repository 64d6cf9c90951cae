//! Configuration sections.

use arbor_core::ParamPrecedence;
use serde::{Deserialize, Serialize};

/// Dispatcher behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Redirect safe requests that lack a trailing slash.
    #[serde(default = "default_true")]
    pub force_canonical: bool,

    /// Status of canonical redirects (301, 302, 303, 307 or 308).
    #[serde(default = "default_redirect_code")]
    pub canonical_redirect_code: u16,

    /// Renderer used for templates without a `name:` prefix.
    #[serde(default = "default_renderer")]
    pub default_renderer: String,

    /// Template root handed to renderers.
    #[serde(default = "default_template_path")]
    pub template_path: String,

    /// Internal forwards allowed per request.
    #[serde(default = "default_max_forwards")]
    pub max_forwards: usize,

    /// Which source wins when query and form name the same key.
    #[serde(default)]
    pub param_precedence: ParamPrecedence,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            force_canonical: true,
            canonical_redirect_code: default_redirect_code(),
            default_renderer: default_renderer(),
            template_path: default_template_path(),
            max_forwards: default_max_forwards(),
            param_precedence: ParamPrecedence::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

impl From<&LoggingConfig> for arbor_telemetry::LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            include_location: config.include_location,
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_redirect_code() -> u16 {
    302
}

fn default_renderer() -> String {
    "default".to_string()
}

fn default_template_path() -> String {
    "templates".to_string()
}

fn default_max_forwards() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}
