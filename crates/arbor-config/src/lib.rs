//! Typed configuration for Arbor.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are rejected)
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use arbor_config::ConfigLoader;
//!
//! # fn main() -> Result<(), arbor_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("arbor.toml")?
//!     .with_env_prefix("ARBOR")
//!     .load()?;
//!
//! println!("forwards bounded at {}", config.dispatch.max_forwards);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [dispatch]
//! force_canonical = true
//! canonical_redirect_code = 302
//! default_renderer = "default"
//! template_path = "templates"
//! max_forwards = 8
//! param_precedence = "form_wins"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! include_location = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `ARBOR__DISPATCH__FORCE_CANONICAL=false`
//! - `ARBOR__DISPATCH__PARAM_PRECEDENCE=query_wins`
//! - `ARBOR__LOGGING__LEVEL=debug`

#![doc(html_root_url = "https://docs.rs/arbor-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::ArborConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LogFormat, LoggingConfig};
