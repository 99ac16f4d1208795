//! Application configuration.
//!
//! Read from the TOML file named by `ADMISSIONS_CONFIG`, or `admissions.toml`
//! in the working directory when present. Every section falls back to its
//! defaults, so an empty or missing file yields a runnable local setup that
//! logs messages instead of sending them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "ADMISSIONS_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "admissions.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum JSON / upload body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// WhatsApp through the Interakt public API.
    Interakt,
    /// Log every message and report it delivered.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_kind")]
    pub kind: ChannelKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Interakt secret key, already base64 encoded as issued.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Prefixed to 10-digit national numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: default_channel_kind(),
            base_url: default_base_url(),
            api_key: None,
            language_code: default_language_code(),
            default_country_code: default_country_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Header of the column holding each recipient's WhatsApp number.
    #[serde(default = "default_contact_column")]
    pub contact_column: String,
    /// Optional header holding an email address.
    #[serde(default = "default_email_column")]
    pub email_column: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            contact_column: default_contact_column(),
            email_column: default_email_column(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Directory holding `<channel_template>.png` preview images.
    #[serde(default)]
    pub preview_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_db_path() -> PathBuf {
    PathBuf::from("admissions.sqlite")
}

fn default_channel_kind() -> ChannelKind {
    ChannelKind::Log
}

fn default_base_url() -> String {
    "https://api.interakt.ai".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_country_code() -> String {
    "91".to_string()
}

fn default_contact_column() -> String {
    "WhatsApp No.".to_string()
}

fn default_email_column() -> String {
    "Email".to_string()
}

impl AppConfig {
    /// Load the configuration file, if any, then apply environment overrides.
    pub fn load() -> Result<Self, String> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => AppConfig::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("invalid config {}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("INTERAKT_API_KEY") {
            if !key.trim().is_empty() {
                self.channel.api_key = Some(key);
            }
        }
        if let Ok(dir) = std::env::var("DOCS_PATH") {
            if !dir.trim().is_empty() {
                self.docs.preview_dir = Some(PathBuf::from(dir));
            }
        }
    }
}
