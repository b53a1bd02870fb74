//! Configuration management for Cross-Channel
//!
//! The core only ever sees configuration values as plain strings. The bundled
//! command-line hosts read them from a TOML file:
//!
//! ```toml
//! [defaults]
//! platforms = ["bluesky", "mastodon", "x"]
//! timeout_secs = 30
//!
//! [bluesky]
//! identifier = "me.bsky.social"
//! password = "app-password"
//!
//! [mastodon]
//! host = "mastodon.social"
//! token = "..."
//!
//! [x]
//! consumer_key = "..."
//! consumer_secret = "..."
//! access_token = "..."
//! access_token_secret = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Directory name used under the user's config directory
pub const APP_DIR: &str = "cross-channel";

pub const DEFAULT_BLUESKY_SERVICE: &str = "https://bsky.social";
pub const DEFAULT_X_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Overrides the directory holding `<platform>_session.json` files
    #[serde(default)]
    pub session_dir: Option<String>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    pub bluesky: Option<BlueskyConfig>,
    pub mastodon: Option<MastodonConfig>,
    pub x: Option<XConfig>,
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Dispatch all targets at once instead of one after another
    #[serde(default)]
    pub concurrent: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    pub identifier: String,
    pub password: String,
    #[serde(default = "default_bluesky_service")]
    pub service: String,
    #[serde(default = "default_langs")]
    pub langs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    /// Instance host, e.g. "mastodon.social"
    pub host: String,
    pub token: String,
}

/// Static OAuth 1.0a user-context secrets. Never persisted by Cross-Channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default = "default_x_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_bluesky_service() -> String {
    DEFAULT_BLUESKY_SERVICE.to_string()
}

fn default_langs() -> Vec<String> {
    vec!["ja".to_string()]
}

fn default_x_api_url() -> String {
    DEFAULT_X_API_URL.to_string()
}

fn default_slack_api_url() -> String {
    DEFAULT_SLACK_API_URL.to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Per-call network bound handed to the publisher
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.timeout_secs)
    }

    /// Resolve the session directory.
    ///
    /// Order: `CROSSCHANNEL_SESSION_DIR`, then `session_dir` from the file,
    /// then `$HOME/.config/cross-channel`.
    pub fn session_root(&self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("CROSSCHANNEL_SESSION_DIR") {
            return Ok(PathBuf::from(shellexpand::tilde(&dir).to_string()));
        }
        if let Some(dir) = &self.session_dir {
            return Ok(PathBuf::from(shellexpand::tilde(dir).to_string()));
        }
        default_session_root()
    }

    /// Names of every platform that has a configuration section
    pub fn configured_platforms(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.bluesky.is_some() {
            names.push("bluesky");
        }
        if self.mastodon.is_some() {
            names.push("mastodon");
        }
        if self.x.is_some() {
            names.push("x");
        }
        if self.slack.is_some() {
            names.push("slack");
        }
        names
    }

    /// Targets used when the caller names none: `defaults.platforms`, or
    /// every configured platform when that list is empty
    pub fn default_targets(&self) -> Vec<String> {
        if self.defaults.platforms.is_empty() {
            self.configured_platforms()
                .into_iter()
                .map(str::to_string)
                .collect()
        } else {
            self.defaults.platforms.clone()
        }
    }
}

/// `CROSSCHANNEL_CONFIG`, else `<config_dir>/cross-channel/config.toml`
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CROSSCHANNEL_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    config_file_in(dirs::config_dir())
}

fn config_file_in(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    let config_dir = config_dir.ok_or(ConfigError::HomeDirUnavailable)?;
    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

/// `$HOME/.config/cross-channel`, resolved once per process
pub fn default_session_root() -> Result<PathBuf> {
    static ROOT: OnceLock<Option<PathBuf>> = OnceLock::new();

    ROOT.get_or_init(|| dirs::home_dir().map(|home| home.join(".config").join(APP_DIR)))
        .clone()
        .ok_or_else(|| ConfigError::HomeDirUnavailable.into())
}
