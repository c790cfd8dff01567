use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use pushbullet_core::{TokenStore, DEFAULT_API_URL, DEFAULT_STREAM_URL};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shown instead of a configured secret
const SECRET_MASK: &str = "********";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// OAuth client id used on the authorization page
    pub client_id: ConfigValue<String>,
    /// OAuth client secret, masked when serialized
    #[serde(serialize_with = "serialize_masked")]
    pub client_secret: ConfigValue<String>,
    /// Where the access token and account data are stored
    pub credential_path: ConfigValue<PathBuf>,
    /// REST API base URL
    pub api_url: ConfigValue<String>,
    /// Realtime stream base URL
    pub stream_url: ConfigValue<String>,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    client_id: Option<String>,
    client_secret: Option<String>,
    credential_path: Option<PathBuf>,
    api_url: Option<String>,
    stream_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut client_id = ConfigValue::new(String::new(), ConfigSource::Default);
        let mut client_secret = ConfigValue::new(String::new(), ConfigSource::Default);
        let mut credential_path =
            ConfigValue::new(Self::default_credential_path(), ConfigSource::Default);
        let mut api_url = ConfigValue::new(DEFAULT_API_URL.to_string(), ConfigSource::Default);
        let mut stream_url =
            ConfigValue::new(DEFAULT_STREAM_URL.to_string(), ConfigSource::Default);
        let mut request_timeout_secs =
            ConfigValue::new(DEFAULT_TIMEOUT_SECS, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(id) = file_config.client_id {
                client_id = ConfigValue::new(id, ConfigSource::File);
            }
            if let Some(secret) = file_config.client_secret {
                client_secret = ConfigValue::new(secret, ConfigSource::File);
            }
            if let Some(cred_path) = file_config.credential_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if cred_path.is_relative() {
                    path.parent()
                        .map(|p| p.join(&cred_path))
                        .unwrap_or(cred_path)
                } else {
                    cred_path
                };
                credential_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(url) = file_config.api_url {
                api_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(url) = file_config.stream_url {
                stream_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(secs) = file_config.request_timeout_secs {
                request_timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(id) = std::env::var("PB_CLIENT_ID") {
            client_id = ConfigValue::new(id, ConfigSource::Environment);
        }
        if let Ok(secret) = std::env::var("PB_CLIENT_SECRET") {
            client_secret = ConfigValue::new(secret, ConfigSource::Environment);
        }
        if let Ok(cred_path) = std::env::var("PB_CREDENTIAL_PATH") {
            credential_path =
                ConfigValue::new(PathBuf::from(cred_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("PB_API_URL") {
            api_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("PB_STREAM_URL") {
            stream_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(secs) = std::env::var("PB_REQUEST_TIMEOUT") {
            let secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PB_REQUEST_TIMEOUT".to_string(), secs))?;
            request_timeout_secs = ConfigValue::new(secs, ConfigSource::Environment);
        }

        Ok(Self {
            client_id,
            client_secret,
            credential_path,
            api_url,
            stream_url,
            request_timeout_secs,
            config_file,
        })
    }

    /// Client secret with its value hidden
    pub fn masked_client_secret(&self) -> ConfigValue<String> {
        mask_secret(&self.client_secret)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// Credential store at the configured path
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(self.credential_path.value.clone())
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/pb/
    /// - macOS: ~/Library/Application Support/pb/
    /// - Windows: %APPDATA%/pb/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pb")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Default credential file: `pbdata` beside the executable
    pub fn default_credential_path() -> PathBuf {
        TokenStore::beside_executable().path().to_path_buf()
    }
}

fn mask_secret(secret: &ConfigValue<String>) -> ConfigValue<String> {
    let value = if secret.value.is_empty() {
        String::new()
    } else {
        SECRET_MASK.to_string()
    };
    ConfigValue::new(value, secret.source.clone())
}

fn serialize_masked<S: Serializer>(
    secret: &ConfigValue<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    mask_secret(secret).serialize(serializer)
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
