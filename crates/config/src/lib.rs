//! Configuration loading for drivebot.
//!
//! Sources are layered with `figment`, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A config file: the path given on the command line, or
//!    `config.toml` in the platform config directory when it exists. TOML,
//!    YAML and JSON are recognised by extension.
//! 3. `DRIVEBOT_*` environment variables, with `__` separating nested keys
//!    (`DRIVEBOT_TELEGRAM__POOL_SIZE=40`).
//! 4. `BOT_TOKEN`, the variable hosted deployments already set.
//!
//! Credentials for the source provider are deliberately not part of the
//! config: only the name of the environment variable holding them and the
//! fallback key file path are.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;
pub const ENV_PREFIX: &str = "DRIVEBOT_";

/// Bot API token. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);
impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}
impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() { f.write_str("BotToken(<unset>)") } else { f.write_str("BotToken(<redacted>)") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Environment variable holding the service-account JSON document.
    pub env_var: String,
    /// Key file read when the environment variable is unset.
    pub key_file: PathBuf,
}
impl Default for Credentials {
    fn default() -> Self {
        Self {
            env_var: "GOOGLE_CREDENTIALS".to_string(),
            key_file: PathBuf::from("service_key.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub transfer_cache: PathBuf,
    pub subscribers: PathBuf,
}
impl Default for State {
    fn default() -> Self {
        Self {
            transfer_cache: PathBuf::from("file_ids.json"),
            subscribers: PathBuf::from("users.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transfer {
    /// Largest declared file size that will be downloaded and re-uploaded.
    pub max_upload_bytes: u64,
    pub chunk_size: u64,
    /// Minimum gap between two progress edits of the status message.
    pub progress_interval_secs: u64,
}
impl Default for Transfer {
    fn default() -> Self {
        Self {
            max_upload_bytes: 99 * MIB,
            chunk_size: 5 * MIB,
            progress_interval_secs: 4,
        }
    }
}
impl Transfer {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telegram {
    pub api_url: String,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_size: usize,
    /// Long-polling wait passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}
impl Default for Telegram {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            read_timeout_secs: 300,
            write_timeout_secs: 300,
            connect_timeout_secs: 60,
            pool_size: 20,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Drive {
    pub api_url: String,
    /// Upper bound on provider requests in flight across all users.
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}
impl Default for Drive {
    fn default() -> Self {
        Self {
            api_url: "https://www.googleapis.com/drive/v3".to_string(),
            max_concurrent_requests: 8,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Broadcast {
    /// Message every known subscriber on startup.
    pub enabled: bool,
    pub message: String,
    /// Pause between two broadcast sends.
    pub pause_ms: u64,
}
impl Default for Broadcast {
    fn default() -> Self {
        Self {
            enabled: true,
            message: "Perfection In Physics Bot Back ❤".to_string(),
            pause_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot_token: BotToken,
    /// Folder the bot treats as its home.
    pub root_folder_id: String,
    pub items_per_page: usize,
    /// Language for users whose locale has no translation.
    pub default_language: String,
    pub credentials: Credentials,
    pub state: State,
    pub transfer: Transfer,
    pub telegram: Telegram,
    pub drive: Drive,
    pub broadcast: Broadcast,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: BotToken::default(),
            root_folder_id: "13OMd9S3N7ONRXiYFbbWPkavuwg3ZKqeD".to_string(),
            items_per_page: 10,
            default_language: "en".to_string(),
            credentials: Credentials::default(),
            state: State::default(),
            transfer: Transfer::default(),
            telegram: Telegram::default(),
            drive: Drive::default(),
            broadcast: Broadcast::default(),
        }
    }
}

impl Config {
    /// Loads and validates the configuration. `explicit` must exist when
    /// given; the platform default path is used only if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|p| p.exists()),
        };
        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "Using config file");
        }
        Self::from_figment(Self::figment(file.as_deref())?)
    }

    /// Builds the layered provider stack without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["BOT_TOKEN"])))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| exn::Exn::from(ErrorKind::Extract(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &'static str, &'static str); 8] = [
            (self.bot_token.is_empty(), "bot_token", "missing; set BOT_TOKEN"),
            (self.root_folder_id.trim().is_empty(), "root_folder_id", "must not be empty"),
            (self.items_per_page == 0, "items_per_page", "must be at least 1"),
            (self.transfer.chunk_size == 0, "transfer.chunk_size", "must be at least 1"),
            (self.transfer.max_upload_bytes == 0, "transfer.max_upload_bytes", "must be at least 1"),
            (self.transfer.progress_interval_secs == 0, "transfer.progress_interval_secs", "must be at least 1"),
            (self.drive.max_concurrent_requests == 0, "drive.max_concurrent_requests", "must be at least 1"),
            (self.telegram.pool_size == 0, "telegram.pool_size", "must be at least 1"),
        ];
        if let Some((_, field, reason)) = checks.into_iter().find(|(failed, _, _)| *failed) {
            exn::bail!(ErrorKind::Invalid { field, reason });
        }
        Ok(())
    }
}

/// `config.toml` in the platform config directory, e.g.
/// `~/.config/drivebot/config.toml` on Linux.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "drivebot").map(|dirs| dirs.config_dir().join("config.toml"))
}
