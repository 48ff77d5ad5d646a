//! Gateway configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! - `AAP_INVENTORY_CONFIG` - config file path (default `~/.config/aap-inventory/config.toml`)
//! - `AAP_HOST`, `AAP_USERNAME`, `AAP_PASSWORD` - connection settings
//! - `AAP_INSECURE_SKIP_VERIFY` - `true`/`1` to skip TLS verification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aapkit::{Client, HttpBackend, HttpBackendBuilder};

use crate::engine::DEFAULT_ORGANIZATION;
use crate::error::{Error, Result};

/// Environment variable for the config file path
pub const ENV_CONFIG: &str = "AAP_INVENTORY_CONFIG";

pub const ENV_HOST: &str = "AAP_HOST";
pub const ENV_USERNAME: &str = "AAP_USERNAME";
pub const ENV_PASSWORD: &str = "AAP_PASSWORD";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "AAP_INSECURE_SKIP_VERIFY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    /// Organization for inventories that do not declare one
    pub default_organization: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            default_organization: DEFAULT_ORGANIZATION,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL, e.g. `https://aap.example.com`
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure_skip_verify: bool,
    /// Request timeout; `0` disables it
    pub timeout_secs: u64,
    /// API path below the host when not `api/v2/`
    pub api_prefix: Option<String>,
    /// Upper bound on pages followed per list call
    pub max_pages: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: None,
            password: None,
            insecure_skip_verify: false,
            timeout_secs: 30,
            api_prefix: None,
            max_pages: aapkit::backend::http::DEFAULT_MAX_PAGES,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_prefix", &self.api_prefix)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl Config {
    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".config").join("aap-inventory").join("config.toml"))
    }

    /// Load from the default path, then apply environment overrides
    ///
    /// A missing file is not an error; everything can come from the
    /// environment.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            log::debug!("Config file {} not found, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override fields from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.gateway.host = host;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.gateway.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.gateway.password = Some(password);
        }
        if let Some(flag) = lookup(ENV_INSECURE_SKIP_VERIFY) {
            let flag = flag.trim().to_ascii_lowercase();
            self.gateway.insecure_skip_verify = matches!(flag.as_str(), "1" | "true" | "yes");
        }
    }

    /// Connect a client to the configured gateway
    ///
    /// Pass `client.backend()` to [`crate::Reconciler::new`].
    pub fn client(&self) -> Result<Client> {
        Client::http(self.http_builder()?).map_err(|e| Error::Config(e.to_string()))
    }

    fn http_builder(&self) -> Result<HttpBackendBuilder> {
        let gateway = &self.gateway;
        if gateway.host.trim().is_empty() {
            return Err(Error::Config(format!("gateway host is not set (set {ENV_HOST})")));
        }

        let mut builder = HttpBackend::builder(gateway.host.trim())
            .insecure_skip_verify(gateway.insecure_skip_verify)
            .timeout((gateway.timeout_secs > 0).then(|| Duration::from_secs(gateway.timeout_secs)))
            .max_pages(gateway.max_pages);
        if let Some(prefix) = &gateway.api_prefix {
            builder = builder.api_prefix(prefix.as_str());
        }
        match (&gateway.username, &gateway.password) {
            (Some(username), Some(password)) => builder = builder.basic_auth(username, password),
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "username and password must be set together".to_string(),
                ));
            }
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_organization, 1);
        assert_eq!(config.gateway.timeout_secs, 30);
        assert_eq!(config.gateway.max_pages, 100);
        assert!(!config.gateway.insecure_skip_verify);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            default_organization = 4

            [gateway]
            host = "https://aap.example.com"
            max_pages = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.default_organization, 4);
        assert_eq!(config.gateway.host, "https://aap.example.com");
        assert_eq!(config.gateway.max_pages, 1);
        assert_eq!(config.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let content = "[gateway]\nhost = \"https://aap.local\"\nusername = \"admin\"\n";
        fs::write(&path, content).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.gateway.host, "https://aap.local");
        assert_eq!(config.gateway.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_load_from_invalid_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[gateway\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.gateway.host = "https://from-file".to_string();
        config.apply_env(env(&[
            (ENV_HOST, "https://from-env"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "secret"),
            (ENV_INSECURE_SKIP_VERIFY, "TRUE"),
        ]));

        assert_eq!(config.gateway.host, "https://from-env");
        assert_eq!(config.gateway.password.as_deref(), Some("secret"));
        assert!(config.gateway.insecure_skip_verify);

        config.apply_env(env(&[(ENV_INSECURE_SKIP_VERIFY, "0")]));
        assert!(!config.gateway.insecure_skip_verify);
        assert_eq!(config.gateway.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = Config::default();
        config.gateway.password = Some("hunter2".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_requires_host() {
        assert!(matches!(Config::default().client(), Err(Error::Config(_))));
    }

    #[test]
    fn test_client_requires_complete_credentials() {
        let mut config = Config::default();
        config.gateway.host = "https://aap.local".to_string();
        config.gateway.username = Some("admin".to_string());
        assert!(matches!(config.client(), Err(Error::Config(_))));

        config.gateway.password = Some("secret".to_string());
        assert!(config.client().is_ok());
        let backend: HttpBackend = config.http_builder().unwrap().build().unwrap();
        assert_eq!(backend.host_url(), "https://aap.local/");
    }

    #[test]
    fn test_client_rejects_bad_scheme() {
        let mut config = Config::default();
        config.gateway.host = "aap.local".to_string();
        assert!(matches!(config.client(), Err(Error::Config(_))));
    }

    #[test]
    fn test_client_drives_reconciler() {
        let mut config = Config::default();
        config.gateway.host = "https://aap.local".to_string();
        let client = config.client().unwrap();

        // Planning a new inventory issues no requests.
        let reconciler = crate::Reconciler::new(client.backend())
            .with_default_organization(config.default_organization);
        let plan = reconciler.plan(&crate::InventoryState::new("lab")).unwrap();
        assert!(plan.inventory.is_create());
    }
}
