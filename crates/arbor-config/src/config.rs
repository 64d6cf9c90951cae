//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LogFormat, LoggingConfig};

const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// Complete Arbor configuration.
///
/// # Example
///
/// ```
/// use arbor_config::ArborConfig;
///
/// let config = ArborConfig::default();
/// assert!(config.dispatch.force_canonical);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ArborConfig {
    /// Dispatcher behaviour.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArborConfig {
    /// Development preset: pretty debug logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the canonical redirect code is not a redirect status
    /// - `max_forwards` is zero
    /// - the default renderer name is empty
    /// - the log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REDIRECT_CODES.contains(&self.dispatch.canonical_redirect_code) {
            return Err(ConfigError::invalid_value(
                "dispatch.canonical_redirect_code",
                format!(
                    "{} is not one of {REDIRECT_CODES:?}",
                    self.dispatch.canonical_redirect_code
                ),
            ));
        }

        if self.dispatch.max_forwards == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.max_forwards",
                "must be at least 1",
            ));
        }

        if self.dispatch.default_renderer.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "dispatch.default_renderer",
                "must not be empty",
            ));
        }

        if let Err(e) = arbor_telemetry::logging::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        Ok(())
    }
}
