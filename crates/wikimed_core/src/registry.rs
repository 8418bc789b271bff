//! Per-caller endpoint and credential lookup.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// Endpoint used when a caller has not been configured.
pub const DEFAULT_BASE_URL: &str = "http://edrak1.selfip.com:64384";

/// Credential code used when a caller has not been configured.
pub const DEFAULT_CREDENTIAL_CODE: &str = "13745064";

/// Endpoint and credential for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the caller's WikiMed endpoint
    pub base_url: String,
    /// Opaque code sent upstream as `HCode`
    #[serde(alias = "hcode")]
    pub credential_code: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, credential_code: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential_code: credential_code.into(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_CREDENTIAL_CODE)
    }
}

/// Returned by a successful [`ClientRegistry::configure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureAck {
    pub success: bool,
    pub message: String,
    pub base_url: String,
}

/// Maps caller identifiers to their [`ClientConfig`].
///
/// Unknown and empty identifiers resolve to the registry's default config, so
/// lookups never fail. Writes to the same identifier are last-write-wins.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: DashMap<String, ClientConfig>,
    default: ClientConfig,
}

impl ClientRegistry {
    pub fn new(default: ClientConfig) -> Self {
        Self {
            clients: DashMap::new(),
            default,
        }
    }

    /// Registry pre-seeded with known callers.
    pub fn with_clients(
        default: ClientConfig,
        clients: impl IntoIterator<Item = (String, ClientConfig)>,
    ) -> Self {
        let registry = Self::new(default);
        for (id, config) in clients {
            registry.clients.insert(id, config);
        }
        registry
    }

    /// Store (or replace) the config for `client_id`.
    ///
    /// Every argument must be non-empty; on error the registry is untouched.
    pub fn configure(
        &self,
        client_id: &str,
        base_url: &str,
        credential_code: &str,
    ) -> Result<ConfigureAck> {
        if client_id.is_empty() {
            return Err(CoreError::missing_field("client_id"));
        }
        if base_url.is_empty() {
            return Err(CoreError::missing_field("base_url"));
        }
        if credential_code.is_empty() {
            return Err(CoreError::missing_field("credential_code"));
        }

        self.clients.insert(
            client_id.to_string(),
            ClientConfig::new(base_url, credential_code),
        );
        tracing::info!("Configured client: {}", client_id);

        Ok(ConfigureAck {
            success: true,
            message: format!("Client {} configured successfully", client_id),
            base_url: base_url.to_string(),
        })
    }

    pub fn resolve(&self, client_id: &str) -> ClientConfig {
        if client_id.is_empty() {
            return self.default.clone();
        }
        self.clients
            .get(client_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn default_config(&self) -> &ClientConfig {
        &self.default
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
