#![deny(unsafe_code)]

//! Configuration loading and validation for vaultpatch.
//!
//! Loads TOML configuration files, layers environment overrides on top, and
//! validates the result. [`AppConfig`] is the central configuration structure
//! shared by the CLI, the MCP server, and the vault client.
//!
//! ## TOML Example
//!
//! ```toml
//! [vault]
//! protocol = "https"
//! host = "127.0.0.1"
//! port = 27124
//! verify_ssl = false
//!
//! [patch]
//! max_suggestions = 5
//!
//! [tools]
//! read_only = false
//! allow_delete = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding the Local REST API key.
pub const ENV_API_KEY: &str = "OBSIDIAN_API_KEY";
/// Environment variable overriding `vault.host`.
pub const ENV_HOST: &str = "OBSIDIAN_HOST";
/// Environment variable overriding `vault.port`.
pub const ENV_PORT: &str = "OBSIDIAN_PORT";
/// Environment variable overriding `vault.protocol`.
pub const ENV_PROTOCOL: &str = "OBSIDIAN_PROTOCOL";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection to the Obsidian Local REST API plugin.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Patch engine tuning.
    #[serde(default)]
    pub patch: PatchConfig,

    /// Which tools are exposed to the assistant.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Connection settings for the Local REST API plugin.
#[derive(Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// "https" (plugin default, self-signed) or "http".
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Verify the plugin's TLS certificate. Off by default because the
    /// plugin ships a self-signed certificate.
    #[serde(default)]
    pub verify_ssl: bool,

    /// API key. Prefer the `OBSIDIAN_API_KEY` environment variable; it is
    /// never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            port: default_port(),
            verify_ssl: false,
            api_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("verify_ssl", &self.verify_ssl)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl VaultConfig {
    /// Base URL of the REST API, e.g. `https://127.0.0.1:27124`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    27124
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_request_timeout_secs() -> u64 {
    6
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Patch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Maximum number of "did you mean" suggestions returned when a target
    /// cannot be found.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
        }
    }
}

fn default_max_suggestions() -> usize {
    5
}

/// Tool exposure configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Only expose tools that never modify the vault.
    #[serde(default)]
    pub read_only: bool,

    /// Expose `obsidian_delete_file`.
    #[serde(default = "default_allow_delete")]
    pub allow_delete: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            allow_delete: default_allow_delete(),
        }
    }
}

fn default_allow_delete() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OBSIDIAN_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `OBSIDIAN_*` overrides using the given lookup, then re-validate.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            debug!(var = ENV_API_KEY, "API key taken from environment");
            self.vault.api_key = Some(key);
        }
        if let Some(host) = get(ENV_HOST) {
            self.vault.host = host;
        }
        if let Some(protocol) = get(ENV_PROTOCOL) {
            self.vault.protocol = protocol;
        }
        if let Some(port) = get(ENV_PORT) {
            self.vault.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{ENV_PORT} must be a port number, got {port:?}"))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_protocols = ["http", "https"];
        if !valid_protocols.contains(&self.vault.protocol.as_str()) {
            return Err(ConfigError::Validation(format!(
                "vault.protocol must be one of {:?}, got {:?}",
                valid_protocols, self.vault.protocol
            )));
        }
        if self.vault.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vault.host must not be empty".to_string(),
            ));
        }
        if self.vault.port == 0 {
            return Err(ConfigError::Validation(
                "vault.port must be non-zero".to_string(),
            ));
        }
        if self.vault.connect_timeout_secs == 0 || self.vault.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "vault timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.patch.max_suggestions == 0 {
            return Err(ConfigError::Validation(
                "patch.max_suggestions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, or a validation error explaining how to provide one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.vault
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "no API key configured: set {ENV_API_KEY} or vault.api_key"
                ))
            })
    }
}
