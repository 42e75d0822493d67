//! Configuration for entrad

use entra_control::ControllerConfig;
use entra_graph::{GraphSettings, SecretData};
use entra_types::ResourceKey;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, SocketAddr};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Intervals, finalizer tokens and concurrency of the control loops
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Graph endpoints and request timeout
    #[serde(default)]
    pub graph: GraphSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credential secrets keyed by `namespace/name`
    #[serde(default, skip_serializing)]
    pub credentials: BTreeMap<String, CredentialSecret>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Contents of a credential secret
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSecret {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<SecretString>,
}

impl CredentialSecret {
    /// Secret data as the resolver reads it; absent keys stay absent so the
    /// resolver reports them per resource.
    pub fn to_data(&self) -> SecretData {
        let mut data = HashMap::new();
        if let Some(tenant_id) = &self.tenant_id {
            data.insert("tenantId".to_string(), SecretString::new(tenant_id.clone()));
        }
        if let Some(client_id) = &self.client_id {
            data.insert("clientId".to_string(), SecretString::new(client_id.clone()));
        }
        if let Some(client_secret) = &self.client_secret {
            data.insert("clientSecret".to_string(), client_secret.clone());
        }
        data
    }
}

/// Splits a `namespace/name` credential key.
pub fn parse_secret_key(key: &str) -> Option<ResourceKey> {
    let (namespace, name) = key.split_once('/')?;
    let (namespace, name) = (namespace.trim(), name.trim());
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some(ResourceKey::new(namespace, name))
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `ENTRAD_`-prefixed environment variables (`__` separates sections,
    /// e.g. `ENTRAD_SERVER__LISTEN_ADDR`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ENTRAD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(config.server.enable_cors);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.controller.max_concurrent_reconciles, 4);
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.graph.api_version, "v1.0");
        assert_eq!(config.controller.resync_interval_secs, 600);
    }

    #[test]
    fn test_credentials_deserialize() {
        let config: DaemonConfig = serde_json::from_value(serde_json::json!({
            "credentials": {
                "team-a/graph-creds": {
                    "tenantId": "tenant-1",
                    "clientId": "client-1",
                    "clientSecret": "s3cret"
                }
            }
        }))
        .unwrap();

        let secret = &config.credentials["team-a/graph-creds"];
        let data = secret.to_data();
        assert_eq!(data.len(), 3);
        assert_eq!(data["clientSecret"].expose_secret(), "s3cret");
    }

    #[test]
    fn test_parse_secret_key() {
        assert_eq!(
            parse_secret_key("team-a/graph-creds"),
            Some(ResourceKey::new("team-a", "graph-creds"))
        );
        assert_eq!(parse_secret_key("graph-creds"), None);
        assert_eq!(parse_secret_key("/graph-creds"), None);
        assert_eq!(parse_secret_key("a/b/c"), None);
    }
}
