//! Configuration for Sigpanel

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Signature panel and backend driver configuration
    #[serde(default)]
    pub signature: SignatureSettings,

    /// Overrides for user-facing texts, keyed by message id
    #[serde(default)]
    pub texts: HashMap<String, String>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address of the web panel
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Mark the session cookie as secure (HTTPS only)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            secure_cookies: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Signature panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSettings {
    /// Name of the backend driver
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Talk to the administrative channel on a remote host
    #[serde(default)]
    pub remote_admin: bool,

    /// Host of the remote administrative channel
    pub remote_server: Option<String>,

    /// Domain appended to usernames that carry none
    pub username_domain: Option<String>,

    /// Enable the rich text editor for the HTML body
    #[serde(default = "default_html_editor")]
    pub html_editor: bool,

    /// Maximum size of an image inlined into the HTML body, in bytes
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,

    /// hMailServer driver settings
    #[serde(default)]
    pub hmail: HmailSettings,

    /// In-memory driver settings
    #[serde(default)]
    pub memory: MemorySettings,
}

impl Default for SignatureSettings {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            remote_admin: false,
            remote_server: None,
            username_domain: None,
            html_editor: default_html_editor(),
            max_image_size: default_max_image_size(),
            hmail: HmailSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

fn default_driver() -> String {
    "hmail".to_string()
}

fn default_html_editor() -> bool {
    true
}

fn default_max_image_size() -> usize {
    64 * 1024
}

/// Administrative bridge settings for the hMailServer driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmailSettings {
    /// URL scheme: "http" or "https"
    #[serde(default = "default_hmail_scheme")]
    pub scheme: String,

    /// Port of the administrative bridge
    #[serde(default = "default_hmail_port")]
    pub port: u16,

    /// Path prefix of the bridge API
    #[serde(default = "default_hmail_base_path")]
    pub base_path: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_hmail_timeout")]
    pub timeout_ms: u64,
}

impl Default for HmailSettings {
    fn default() -> Self {
        Self {
            scheme: default_hmail_scheme(),
            port: default_hmail_port(),
            base_path: default_hmail_base_path(),
            timeout_ms: default_hmail_timeout(),
        }
    }
}

fn default_hmail_scheme() -> String {
    "http".to_string()
}

fn default_hmail_port() -> u16 {
    8089
}

fn default_hmail_base_path() -> String {
    "/api".to_string()
}

fn default_hmail_timeout() -> u64 {
    5000
}

/// In-memory driver settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySettings {
    /// When set, every request must carry this password
    pub require_password: Option<String>,

    /// Known account addresses; empty means every account exists
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl Config {
    /// Load configuration from a single TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the default file locations and environment
    ///
    /// Environment variables use the `SIGPANEL__` prefix with `__` as the
    /// nesting separator, e.g. `SIGPANEL__SIGNATURE__DRIVER=memory`.
    pub fn load() -> crate::Result<Self> {
        let paths = [
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/sigpanel/config.toml"),
        ];

        let mut builder = config::Config::builder();
        match paths.iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path.as_path()));
            }
            None => tracing::warn!("No configuration file found, using defaults"),
        }

        builder
            .add_source(
                config::Environment::with_prefix("SIGPANEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Config>())
            .map_err(|e| crate::Error::Config(format!("Failed to load config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:8081");
        assert_eq!(config.signature.driver, "hmail");
        assert!(!config.signature.remote_admin);
        assert!(config.signature.html_editor);
        assert_eq!(config.signature.max_image_size, 65536);
        assert_eq!(config.signature.hmail.port, 8089);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind = "127.0.0.1:9000"

[signature]
driver = "memory"
remote_admin = true
remote_server = "mail.example.com"
username_domain = "example.com"
max_image_size = 1024

[signature.hmail]
port = 9443
scheme = "https"

[texts]
successfullyupdated = "Saved."
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.signature.driver, "memory");
        assert_eq!(config.signature.remote_server.as_deref(), Some("mail.example.com"));
        assert_eq!(config.signature.username_domain.as_deref(), Some("example.com"));
        assert_eq!(config.signature.max_image_size, 1024);
        assert_eq!(config.signature.hmail.scheme, "https");
        assert_eq!(config.signature.hmail.base_path, "/api");
        assert_eq!(config.texts.get("successfullyupdated").map(String::as_str), Some("Saved."));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.signature.driver, "hmail");
    }
}
