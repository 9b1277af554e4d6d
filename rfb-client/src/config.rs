//! Configuration types for the VNC client.
//!
//! Configurations can be built in code with [`Config::builder`] or loaded from
//! TOML:
//!
//! ```toml
//! [connection]
//! host = "10.0.0.5"
//! port = 5901
//! password = "secret"
//!
//! [session]
//! keep_framebuffer = true
//! ```

use crate::errors::RfbClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete VNC client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username for Apple Remote Desktop authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password (if required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Session timeout in milliseconds (0 = none).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> u16 {
    5900
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: None,
            password: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Protocol session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ask the server to leave other clients connected.
    #[serde(default = "default_true")]
    pub shared: bool,
    /// Materialize received pixels into a local framebuffer.
    #[serde(default)]
    pub keep_framebuffer: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shared: default_true(),
            keep_framebuffer: false,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Config`] if the document is malformed or
    /// fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, RfbClientError> {
        let config: Config =
            toml::from_str(text).map_err(|e| RfbClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfbClientError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, RfbClientError> {
        toml::to_string(self).map_err(|e| RfbClientError::Config(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RfbClientError> {
        if self.connection.host.is_empty() {
            return Err(RfbClientError::Config("Host cannot be empty".to_string()));
        }

        if self.connection.port == 0 {
            return Err(RfbClientError::Config("Port cannot be 0".to_string()));
        }

        if self.connection.username.is_some() && self.connection.password.is_none() {
            return Err(RfbClientError::Config(
                "A username requires a password".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the session timeout, or `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.connection.timeout_ms > 0).then(|| Duration::from_millis(self.connection.timeout_ms))
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets the username and password used by Apple Remote Desktop servers.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.connection.username = Some(username.into());
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets the session timeout in milliseconds (0 disables it).
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.connection.timeout_ms = timeout_ms;
        self
    }

    /// Sets the shared-session flag sent in ClientInit.
    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.config.session.shared = shared;
        self
    }

    /// Sets whether received pixels are kept.
    #[must_use]
    pub fn keep_framebuffer(mut self, keep: bool) -> Self {
        self.config.session.keep_framebuffer = keep;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RfbClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
