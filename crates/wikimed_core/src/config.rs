//! Configuration for the WikiMed adapter
//!
//! Settings are read from TOML and can be overridden from the environment.
//! A missing file is not an error; the built-in defaults apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::DEFAULT_REQUEST_TIMEOUT;
use crate::error::ConfigError;
use crate::registry::{ClientConfig, ClientRegistry};

/// Environment variable overriding the default endpoint.
pub const ENV_BASE_URL: &str = "WIKIMED_BASE_URL";
/// Environment variable overriding the default credential code.
pub const ENV_HCODE: &str = "WIKIMED_HCODE";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "WIKIMED_TIMEOUT_SECS";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikimedConfig {
    /// Endpoint and credential for callers without their own entry
    #[serde(default)]
    pub default_client: ClientConfig,

    /// Upper bound on each upstream request
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Callers known at startup, keyed by client id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clients: BTreeMap<String, ClientConfig>,

    /// MCP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// MCP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `stdio` or `http`
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Bind address for the HTTP transport
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_transport() -> String {
    "stdio".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            bind: default_bind(),
        }
    }
}

impl Default for WikimedConfig {
    fn default() -> Self {
        Self {
            default_client: ClientConfig::default(),
            request_timeout_secs: default_timeout_secs(),
            clients: BTreeMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl WikimedConfig {
    /// Load configuration from standard locations
    pub async fn load() -> ConfigResult<Self> {
        load_config_from_standard_locations().await
    }

    /// Load configuration from a specific file
    pub async fn load_from(path: &Path) -> ConfigResult<Self> {
        load_config(path).await
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> ConfigResult<()> {
        save_config(self, path).await
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `WIKIMED_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, for testability.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.default_client.base_url = base_url;
        }
        if let Some(code) = lookup(ENV_HCODE) {
            self.default_client.credential_code = code;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs =
                secs.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        field: ENV_TIMEOUT_SECS.to_string(),
                        reason: format!("expected a whole number of seconds: {e}"),
                    })?;
        }
        Ok(())
    }

    /// Reject values the adapter cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.default_client.base_url.is_empty() {
            return Err(invalid("default_client.base_url", "must not be empty"));
        }
        if self.default_client.credential_code.is_empty() {
            return Err(invalid("default_client.credential_code", "must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1 second"));
        }
        for (id, client) in &self.clients {
            if id.is_empty() || client.base_url.is_empty() || client.credential_code.is_empty() {
                return Err(invalid(
                    &format!("clients.{id}"),
                    "client id, base_url and credential_code must all be non-empty",
                ));
            }
        }
        match self.server.transport.as_str() {
            "stdio" | "http" => Ok(()),
            other => Err(invalid(
                "server.transport",
                &format!("unknown transport '{other}', expected stdio or http"),
            )),
        }
    }

    /// Build a registry seeded with the configured callers.
    pub fn build_registry(&self) -> ClientRegistry {
        ClientRegistry::with_clients(self.default_client.clone(), self.clients.clone())
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> ConfigResult<WikimedConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|cause| ConfigError::Io {
            path: path.display().to_string(),
            cause,
        })?;

    toml::from_str(&content).map_err(|cause| ConfigError::Parse {
        path: path.display().to_string(),
        cause,
    })
}

/// Save configuration to a TOML file
pub async fn save_config(config: &WikimedConfig, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|cause| ConfigError::Io {
                path: parent.display().to_string(),
                cause,
            })?;
    }

    let content = toml::to_string_pretty(config).map_err(|cause| ConfigError::Serialize { cause })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|cause| ConfigError::Io {
            path: path.display().to_string(),
            cause,
        })
}

/// Candidate configuration files, most specific first
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from("wikimed.toml"));

    // User config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("wikimed").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".wikimed").join("config.toml"));
    }

    paths
}

/// Load configuration from standard locations
pub async fn load_config_from_standard_locations() -> ConfigResult<WikimedConfig> {
    for path in config_paths() {
        if path.exists() {
            tracing::info!("Loading configuration from {}", path.display());
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(WikimedConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DEFAULT_BASE_URL, DEFAULT_CREDENTIAL_CODE};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_registry_fallback() {
        let config = WikimedConfig::default();
        assert_eq!(config.default_client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_client.credential_code, DEFAULT_CREDENTIAL_CODE);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.transport, "stdio");
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: WikimedConfig = toml::from_str(
            r#"
            request_timeout_secs = 10

            [clients.north]
            base_url = "http://north.example:9000"
            hcode = "111"
            "#,
        )
        .unwrap();

        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.default_client, ClientConfig::default());
        assert_eq!(
            config.clients["north"],
            ClientConfig::new("http://north.example:9000", "111")
        );

        let registry = config.build_registry();
        assert_eq!(registry.resolve("north").credential_code, "111");
        assert_eq!(registry.resolve("south"), ClientConfig::default());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "http://override:1"),
            (ENV_HCODE, "4242"),
            (ENV_TIMEOUT_SECS, " 5 "),
        ]);

        let mut config = WikimedConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.default_client,
            ClientConfig::new("http://override:1", "4242")
        );
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn bad_timeout_override_is_reported() {
        let mut config = WikimedConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == ENV_TIMEOUT_SECS));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut config = WikimedConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = WikimedConfig::default();
        config.server.transport = "carrier-pigeon".to_string();
        assert!(config.validate().is_err());

        let mut config = WikimedConfig::default();
        config
            .clients
            .insert("broken".to_string(), ClientConfig::new("", "1"));
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wikimed.toml");

        let mut config = WikimedConfig::default();
        config.request_timeout_secs = 12;
        config.server.transport = "http".to_string();
        config.clients.insert(
            "clinic".to_string(),
            ClientConfig::new("http://clinic.example", "77"),
        );

        config.save_to(&path).await.unwrap();
        let loaded = WikimedConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
