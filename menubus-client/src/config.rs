//! Configuration for MenuBus sessions and the facade.
//!
//! Centralized configuration with sensible defaults, a builder, and JSON
//! loading where every missing field falls back to its default.

use std::path::Path;

use menubus_common::{ConfigError, ConfigResult, Namespaces};
use serde::{Deserialize, Serialize};

/// Default peer host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default peer port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default read chunk for short-read framing.
pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// How inbound bytes are split into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FramingMode {
    /// Read `chunk_size` bytes at a time; a short read ends a message.
    ///
    /// Misframes messages whose length is a multiple of `chunk_size` and
    /// merges replies that arrive back-to-back.
    ShortRead { chunk_size: usize },

    /// Split on RESP2 reply boundaries; malformed input is an error.
    Resp,
}

impl Default for FramingMode {
    fn default() -> Self {
        FramingMode::ShortRead {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FramingMode {
    /// A one-byte chunk can never read short, so it would never frame.
    pub fn validate(&self) -> ConfigResult<()> {
        match *self {
            FramingMode::ShortRead { chunk_size } if chunk_size < 2 => Err(ConfigError::Invalid(
                format!("chunk_size must be at least 2, got {}", chunk_size),
            )),
            _ => Ok(()),
        }
    }
}

/// Configuration of a single session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name used in logs and handed to the message handler.
    pub label: String,
    /// Peer host name or address.
    pub host: String,
    /// Peer port.
    pub port: u16,
    /// Inbound framing strategy.
    pub framing: FramingMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            label: "session".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            framing: FramingMode::default(),
        }
    }
}

impl SessionConfig {
    /// Creates a config for `host:port` with default framing.
    pub fn new(label: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        SessionConfig {
            label: label.into(),
            host: host.into(),
            port,
            framing: FramingMode::default(),
        }
    }

    /// Replaces the framing mode.
    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    /// `host:port`, as used in logs and connection errors.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        self.framing.validate()
    }
}

/// Configuration of the facade and its three sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Peer host name or address.
    pub host: String,
    /// Peer port.
    pub port: u16,
    /// Inbound framing strategy shared by all sessions.
    pub framing: FramingMode,
    /// Key and channel names.
    pub namespaces: Namespaces,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            framing: FramingMode::default(),
            namespaces: Namespaces::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Derives the config of one of the facade's sessions.
    pub fn session(&self, label: &str) -> SessionConfig {
        SessionConfig {
            label: label.to_string(),
            host: self.host.clone(),
            port: self.port,
            framing: self.framing,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        self.framing.validate()?;
        self.namespaces.validate()
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the peer host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the peer port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the framing mode
    pub fn framing(mut self, framing: FramingMode) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the key and channel names
    pub fn namespaces(mut self, namespaces: Namespaces) -> Self {
        self.config.namespaces = namespaces;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
