//! Layered settings: compiled defaults, then a TOML file, then `SMSQ_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BACKLOG_DAYS, default_db_path};

/// Settings file looked up in the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "smsq.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub api: ApiSettings,
    pub oauth: OAuthSettings,
    pub authorization: AuthorizationSettings,
    pub reference: ReferenceSettings,
    pub log: LogSettings,
    pub state: StateSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseSettings {
    /// SQLite replica of the warehouse tables.
    pub path: String,
    /// How many days of inbound messages make up the backlog.
    pub backlog_days: i64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            path: "warehouse.db".to_string(),
            backlog_days: DEFAULT_BACKLOG_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the messaging service, e.g. `https://host/v1`.
    pub base_url: String,
    /// Static `x-api-key` value.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            authorize_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    pub allowed_users: Vec<String>,
}

impl AuthorizationSettings {
    /// Whether `email` is on the allow-list. Comparison ignores case.
    pub fn is_allowed(&self, email: &str) -> bool {
        self.allowed_users
            .iter()
            .any(|u| u.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceSettings {
    /// CSV with a `Lang` column.
    pub languages: String,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            languages: "languages.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: String,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    /// Local database for the signed-in identity.
    pub db: String,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            db: default_db_path().to_string_lossy().into_owned(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or [`DEFAULT_SETTINGS_FILE`]) with env overrides.
    /// A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&file))
            .merge(env_provider())
            .extract()
            .with_context(|| format!("failed to load settings from {}", file.display()))
    }

    /// Parse settings from a TOML string without touching the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::string(content))
            .extract()
            .context("invalid settings")
    }
}

const SECTIONS: &[&str] = &[
    "warehouse",
    "api",
    "oauth",
    "authorization",
    "reference",
    "log",
    "state",
];

/// `SMSQ_API_BASE_URL` must land on `api.base_url`, not `api.base.url`,
/// so only the leading section separator is rewritten.
fn env_provider() -> Env {
    Env::prefixed("SMSQ_").map(|key| section_key(key.as_str()).into())
}

fn section_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
