//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use crate::config::{ConfigError, DebugMode, ServerSettings};

/// Builder-style configuration for creating the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) debug: DebugMode,
}

impl ServerConfig {
    /// Construct a server configuration bound to `bind_addr` with debug
    /// mode disabled.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            debug: DebugMode::Disabled,
        }
    }

    /// Resolve the bind address from loaded settings.
    ///
    /// # Errors
    /// Propagates [`ConfigError`] when the configured address is malformed.
    pub fn from_settings(settings: &ServerSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(settings.bind_addr()?))
    }

    /// Set whether failure responses expose tracebacks.
    #[must_use]
    pub fn with_debug(mut self, debug: DebugMode) -> Self {
        self.debug = debug;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Return the configured debug mode.
    #[must_use]
    pub fn debug(&self) -> DebugMode {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn settings_supply_the_bind_address() {
        let settings = ServerSettings {
            bind_addr: Some("127.0.0.1:9100".to_owned()),
            log_level: None,
        };
        let config = ServerConfig::from_settings(&settings)
            .expect("valid address")
            .with_debug(DebugMode::Enabled);
        assert_eq!(config.bind_addr().port(), 9100);
        assert!(config.debug().is_enabled());
    }
}
