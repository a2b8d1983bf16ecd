//! Process configuration.
//!
//! [`ServerSettings`] is loaded through OrthoConfig (command line, config
//! file, then `GEO_ANALYTICS_*` environment variables). The `DEBUG` toggle is
//! read separately through [`mockable::Env`] so it can be resolved once at
//! startup and injected into the error dispatcher.

use std::net::SocketAddr;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

/// Environment variable enabling tracebacks in error responses.
pub const DEBUG_ENV: &str = "DEBUG";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors raised while resolving configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The bind address is not a `host:port` socket address.
    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddr {
        /// Value that failed to parse.
        value: String,
        /// Parser error.
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Server settings loaded via OrthoConfig.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GEO_ANALYTICS")]
pub struct ServerSettings {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: Option<String>,
    /// Default log filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl ServerSettings {
    /// Return the configured bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidBindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: value.to_owned(),
                source,
            })
    }

    /// Return the configured log level, falling back to `info`.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Whether failure responses may expose diagnostic detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebugMode {
    /// Tracebacks stay in the logs.
    #[default]
    Disabled,
    /// Unclassified failures carry their traceback in the response body.
    Enabled,
}

impl DebugMode {
    /// Resolve the mode from `DEBUG`.
    ///
    /// Unset means disabled. Unrecognised values are logged and treated as
    /// disabled.
    ///
    /// # Examples
    /// ```
    /// use geo_analytics_api::config::DebugMode;
    /// use mockable::DefaultEnv;
    ///
    /// let mode = DebugMode::from_env(&DefaultEnv::new());
    /// assert_eq!(mode.is_enabled(), mode == DebugMode::Enabled);
    /// ```
    pub fn from_env<E: Env>(env: &E) -> Self {
        let Some(value) = env.string(DEBUG_ENV) else {
            return Self::Disabled;
        };
        match parse_bool(&value) {
            Some(true) => Self::Enabled,
            Some(false) => Self::Disabled,
            None => {
                warn!(
                    value = %value,
                    expected = BOOL_EXPECTED,
                    "invalid {DEBUG_ENV}; defaulting to disabled"
                );
                Self::Disabled
            }
        }
    }

    /// Return `true` when tracebacks are exposed.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
