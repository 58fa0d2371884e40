//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::PathBuf;

use tempfile::TempDir;
use vaultpatch_config::{AppConfig, ConfigError};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .api_key("test-key")
///     .read_only(true)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.config.vault.api_key = Some(key.to_string());
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.vault.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.vault.port = port;
        self
    }

    pub fn protocol(mut self, protocol: &str) -> Self {
        self.config.vault.protocol = protocol.to_string();
        self
    }

    /// Point the vault section at a `http://host:port` base URL.
    pub fn base_url(self, url: &str) -> Self {
        let rest = url.trim_end_matches('/');
        let (protocol, rest) = rest.split_once("://").unwrap_or(("http", rest));
        let (host, port) = rest.rsplit_once(':').unwrap_or((rest, "80"));
        self.protocol(protocol)
            .host(host)
            .port(port.parse().unwrap_or(80))
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.tools.read_only = read_only;
        self
    }

    pub fn allow_delete(mut self, allow: bool) -> Self {
        self.config.tools.allow_delete = allow;
        self
    }

    pub fn max_suggestions(mut self, n: usize) -> Self {
        self.config.patch.max_suggestions = n;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `vaultpatch.toml` in a temp directory that is removed on drop.
pub struct TestConfigFile {
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("vaultpatch.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::load(&self.path).await
    }
}
