//! Configuration Loading
//!
//! Centralized configuration for every entry point (stdio, SSE, CLI), loaded
//! from a TOML file at `~/.config/antd-codegen/config.toml` and the process
//! environment.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the daemon after loading)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! The API credential is only ever read from the environment. Its absence is
//! a fatal startup error.
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "https://api.dify.ai/v1"
//! request_timeout_secs = 120
//!
//! [server]
//! listen_addr = "127.0.0.1:3000"
//! channel_capacity = 64
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the remote API credential (required)
pub const API_KEY_ENV: &str = "CODEGEN_API_KEY";
/// Environment variable overriding the remote API base URL
pub const API_URL_ENV: &str = "CODEGEN_API_URL";
/// Environment variable overriding the request timeout in seconds
pub const REQUEST_TIMEOUT_ENV: &str = "CODEGEN_REQUEST_TIMEOUT";
/// Environment variable overriding the SSE listen address
pub const LISTEN_ADDR_ENV: &str = "CODEGEN_LISTEN_ADDR";
/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "CODEGEN_CONFIG";

/// Default remote API base URL
pub const DEFAULT_API_URL: &str = "https://api.dify.ai/v1";
/// Default SSE listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
/// Default per-channel message queue capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API credential is not set
    #[error("{var} must be set to the remote API key")]
    MissingCredential {
        /// Name of the environment variable that was checked
        var: &'static str,
    },

    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Built-in default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Remote API section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Base URL of the remote chat API
    pub base_url: Option<String>,

    /// Request timeout in seconds (unset = HTTP client default)
    pub request_timeout_secs: Option<u64>,
}

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address for the SSE transport
    pub listen_addr: Option<String>,

    /// Per-channel message queue capacity
    pub channel_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeToml {
    /// Remote API configuration section
    pub api: ApiToml,

    /// Server configuration section
    pub server: ServerToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration shared by every entry point
#[derive(Clone)]
pub struct BridgeConfig {
    /// Remote API credential
    pub api_key: String,

    /// Remote API base URL, without trailing slash
    pub base_url: String,

    /// Optional request timeout
    pub request_timeout: Option<Duration>,

    /// Listen address for the SSE transport
    pub listen_addr: SocketAddr,

    /// Per-channel message queue capacity
    pub channel_capacity: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("listen_addr", &self.listen_addr)
            .field("channel_capacity", &self.channel_capacity)
            .field("config_file_path", &self.config_file_path)
            .field("source", &self.source)
            .finish()
    }
}

impl BridgeConfig {
    /// Create a configuration with default values and the given credential
    ///
    /// Mostly useful for tests and embedding; entry points use [`load_config`].
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/antd-codegen/config.toml` or
/// `~/.config/antd-codegen/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("antd-codegen").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// The file location is taken from `CODEGEN_CONFIG` when set, otherwise
/// [`default_config_path`].
///
/// # Errors
///
/// Returns an error if the credential is missing, the config file cannot be
/// read or parsed, or a value fails validation.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .map(PathBuf::from)
        .or_else(default_config_path);
    load_config_from_path(path)
}

/// Load configuration from a specific path plus the process environment
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BridgeConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Load configuration from a specific path and an explicit variable lookup
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with<F>(path: Option<PathBuf>, env: F) -> Result<BridgeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = env(API_KEY_ENV)
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingCredential { var: API_KEY_ENV })?;

    let mut toml_config = BridgeToml::default();
    let mut config_file_path = None;
    let mut source = ConfigSource::Default;

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml_config = toml::from_str(&toml_content)?;
            config_file_path = Some(config_path.clone());
            source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    let mut base_url = toml_config
        .api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let mut timeout_secs = toml_config.api.request_timeout_secs;
    let mut listen_addr = toml_config
        .server
        .listen_addr
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let channel_capacity = toml_config
        .server
        .channel_capacity
        .unwrap_or(DEFAULT_CHANNEL_CAPACITY);

    // Environment overrides file values
    if let Some(url) = env(API_URL_ENV) {
        base_url = url;
        source = ConfigSource::Env;
    }
    if let Some(raw) = env(REQUEST_TIMEOUT_ENV) {
        let secs = raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::ValidationError(format!("{REQUEST_TIMEOUT_ENV} must be an integer, got {raw:?}"))
        })?;
        timeout_secs = Some(secs);
        source = ConfigSource::Env;
    }
    if let Some(addr) = env(LISTEN_ADDR_ENV) {
        listen_addr = addr;
        source = ConfigSource::Env;
    }

    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "API base URL must start with http:// or https://, got {base_url:?}"
        )));
    }

    let listen_addr: SocketAddr = listen_addr.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("Invalid listen address {listen_addr:?}"))
    })?;

    if channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "server.channel_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(BridgeConfig {
        api_key,
        base_url,
        request_timeout: timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
        listen_addr,
        channel_capacity,
        config_file_path,
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let result = load_config_with(None, env_from(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingCredential { var: API_KEY_ENV })
        ));
    }

    #[test]
    fn test_blank_credential_is_fatal() {
        let result = load_config_with(None, env_from(&[(API_KEY_ENV, "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingCredential { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = load_config_with(None, env_from(&[(API_KEY_ENV, "app-123")])).unwrap();
        assert_eq!(config.api_key, "app-123");
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_file_then_env_priority() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "http://file.example/v1/"
request_timeout_secs = 30

[server]
listen_addr = "0.0.0.0:8080"
channel_capacity = 8
"#
        )
        .unwrap();

        let path = Some(file.path().to_path_buf());
        let config =
            load_config_with(path.clone(), env_from(&[(API_KEY_ENV, "k")])).unwrap();
        assert_eq!(config.base_url, "http://file.example/v1");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path, path);

        let config = load_config_with(
            path,
            env_from(&[
                (API_KEY_ENV, "k"),
                (API_URL_ENV, "https://env.example/v1"),
                (LISTEN_ADDR_ENV, "127.0.0.1:9999"),
            ]),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://env.example/v1");
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9999");
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_url = load_config_with(
            None,
            env_from(&[(API_KEY_ENV, "k"), (API_URL_ENV, "ftp://nope")]),
        );
        assert!(matches!(bad_url, Err(ConfigError::ValidationError(_))));

        let bad_addr = load_config_with(
            None,
            env_from(&[(API_KEY_ENV, "k"), (LISTEN_ADDR_ENV, "not an address")]),
        );
        assert!(matches!(bad_addr, Err(ConfigError::ValidationError(_))));

        let bad_timeout = load_config_with(
            None,
            env_from(&[(API_KEY_ENV, "k"), (REQUEST_TIMEOUT_ENV, "soon")]),
        );
        assert!(matches!(bad_timeout, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        let result = load_config_with(
            Some(file.path().to_path_buf()),
            env_from(&[(API_KEY_ENV, "k")]),
        );
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = BridgeConfig::with_api_key("super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
