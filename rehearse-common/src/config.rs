//! Configuration loading and resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_BIND: &str = "REHEARSE_BIND";
pub const ENV_DATABASE: &str = "REHEARSE_DATABASE";
pub const ENV_MODEL_API_KEY: &str = "REHEARSE_MODEL_API_KEY";
pub const ENV_MODEL: &str = "REHEARSE_MODEL";
pub const ENV_IDENTITY_API_KEY: &str = "REHEARSE_IDENTITY_API_KEY";
pub const ENV_API_URL: &str = "REHEARSE_API_URL";
pub const ENV_GUEST_STORAGE: &str = "REHEARSE_GUEST_STORAGE";
pub const ENV_ID_TOKEN: &str = "REHEARSE_ID_TOKEN";

pub const DEFAULT_BIND: &str = "127.0.0.1:5780";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.0-flash-live-001";
pub const DEFAULT_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub live_model: Option<String>,
    pub live_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentitySection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientSection {
    pub api_base_url: Option<String>,
    pub guest_storage: Option<PathBuf>,
    pub id_token: Option<String>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub model: ModelSection,
    pub identity: IdentitySection,
    pub client: ClientSection,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load configuration from an explicit path or the platform locations
    ///
    /// An explicit path that does not exist is an error; a missing file in
    /// the platform locations yields defaults with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using environment and compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config = Self::from_file(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// First existing config file among the platform locations
///
/// Linux also checks `/etc/rehearse/config.toml` after the user config dir.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rehearse").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rehearse/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rehearse"))
        .unwrap_or_else(|| PathBuf::from("./rehearse_data"))
}

/// Resolve one setting: CLI → ENV → TOML
///
/// Blank values are treated as unset at every tier.
pub fn resolve_setting(cli: Option<&str>, env_var: &str, toml: Option<&str>) -> Option<String> {
    fn non_blank(s: &str) -> bool {
        !s.trim().is_empty()
    }

    if let Some(value) = cli.filter(|s| non_blank(s)) {
        return Some(value.to_string());
    }
    if let Ok(value) = std::env::var(env_var) {
        if non_blank(&value) {
            return Some(value);
        }
    }
    toml.filter(|s| non_blank(s)).map(str::to_string)
}

/// Resolved API service settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database: PathBuf,
}

impl ServerConfig {
    pub fn resolve(toml: &TomlConfig, cli_bind: Option<&str>, cli_database: Option<&Path>) -> Self {
        let bind = resolve_setting(cli_bind, ENV_BIND, toml.server.bind.as_deref())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let database = cli_database
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_DATABASE).ok().map(PathBuf::from))
            .or_else(|| toml.server.database.clone())
            .unwrap_or_else(|| default_data_dir().join("rehearse.db"));

        Self { bind, database }
    }
}

/// Resolved generative model settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub live_model: String,
    pub live_url: String,
}

impl ModelConfig {
    pub fn resolve(toml: &TomlConfig, cli_api_key: Option<&str>) -> Self {
        let section = &toml.model;
        Self {
            api_key: resolve_setting(cli_api_key, ENV_MODEL_API_KEY, section.api_key.as_deref()),
            model: resolve_setting(None, ENV_MODEL, section.model.as_deref())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            live_model: section
                .live_model
                .clone()
                .unwrap_or_else(|| DEFAULT_LIVE_MODEL.to_string()),
            live_url: section
                .live_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LIVE_URL.to_string()),
        }
    }

    /// API key or a configuration error explaining where to set it
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "Model API key not configured. Please configure using one of:\n\
                 1. Command line: --model-api-key <key>\n\
                 2. Environment: {}=your-key-here\n\
                 3. TOML config: [model] api_key = \"your-key\"",
                ENV_MODEL_API_KEY
            ))
        })
    }
}

/// Resolved identity provider settings
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl IdentityConfig {
    pub fn resolve(toml: &TomlConfig) -> Self {
        Self {
            api_key: resolve_setting(None, ENV_IDENTITY_API_KEY, toml.identity.api_key.as_deref()),
            base_url: toml
                .identity
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_string()),
        }
    }
}

/// Resolved client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub guest_storage: PathBuf,
    pub id_token: Option<String>,
}

impl ClientConfig {
    pub fn resolve(toml: &TomlConfig, cli_api_url: Option<&str>, cli_token: Option<&str>) -> Self {
        let section = &toml.client;
        let api_base_url = resolve_setting(cli_api_url, ENV_API_URL, section.api_base_url.as_deref())
            .unwrap_or_else(|| format!("http://{}/api", DEFAULT_BIND));

        let guest_storage = std::env::var(ENV_GUEST_STORAGE)
            .ok()
            .map(PathBuf::from)
            .or_else(|| section.guest_storage.clone())
            .unwrap_or_else(|| default_data_dir().join("local-storage.json"));

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            guest_storage,
            id_token: resolve_setting(cli_token, ENV_ID_TOKEN, section.id_token.as_deref()),
        }
    }
}
