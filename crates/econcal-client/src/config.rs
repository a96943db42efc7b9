//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/econcal/config.toml` by default.
//!
//! Credential values (`source.api_key`, `discord.token`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use econcal_core::{DEFAULT_HORIZON_DAYS, DEFAULT_LOCATION, SourceKind};
use econcal_sync::{SyncConfig, default_lock_path};
use serde::{Deserialize, Serialize};

use crate::secret;

/// Configuration for the econcal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Sync engine settings.
    pub sync: SyncSettings,

    /// Upstream calendar settings.
    pub source: SourceSettings,

    /// Discord store settings.
    pub discord: DiscordSettings,
}

/// `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Discord guild (server) id.
    pub guild_id: Option<String>,

    /// Days ahead of today to synchronize.
    pub horizon_days: u32,

    /// Keep events that already started earlier today.
    pub include_past: bool,

    /// Hours between scheduled cycles.
    pub interval_hours: u64,

    pub source_timeout_secs: u64,

    pub store_timeout_secs: u64,

    /// Location label shown on created events.
    pub location: String,

    /// Cycle lock shared by `run` and `sync`. Defaults to
    /// `$XDG_RUNTIME_DIR/econcal-<guild>.lock`.
    pub lock_file: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            guild_id: None,
            horizon_days: DEFAULT_HORIZON_DAYS,
            include_past: false,
            interval_hours: 24,
            source_timeout_secs: 15,
            store_timeout_secs: 15,
            location: DEFAULT_LOCATION.to_string(),
            lock_file: None,
        }
    }
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Which provider shape to use.
    pub kind: SourceKind,

    /// Endpoint override. Required for `scraped-html` and `rss`.
    pub url: Option<String>,

    /// API key (supports `pass::` and `env::` prefixes).
    pub api_key: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Finnhub,
            url: None,
            api_key: None,
        }
    }
}

impl SourceSettings {
    /// Returns the configured URL, or the provider's well-known endpoint.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(ref url) = self.url {
            return Some(url.clone());
        }
        match self.kind {
            #[cfg(feature = "finnhub")]
            SourceKind::Finnhub => Some(econcal_providers::finnhub::DEFAULT_URL.to_string()),
            #[cfg(feature = "json-feed")]
            SourceKind::JsonFeed => Some(econcal_providers::json_feed::DEFAULT_URL.to_string()),
            _ => None,
        }
    }

    /// Resolves the API key, if one is configured.
    pub fn resolve_api_key(&self) -> Result<Option<String>, String> {
        self.api_key
            .as_deref()
            .map(|raw| {
                secret::resolve(raw).map_err(|e| format!("failed to resolve source.api_key: {}", e))
            })
            .transpose()
    }
}

/// `[discord]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// Bot token (supports `pass::` and `env::` prefixes).
    pub token: Option<String>,

    /// REST API base override.
    pub api_base: Option<String>,
}

impl DiscordSettings {
    pub fn resolve_token(&self) -> Result<String, String> {
        let raw = self.token.as_deref().ok_or_else(|| {
            format!(
                "Discord token not found. Add to {}:\n  \
                 [discord]\n  \
                 token = \"env::DISCORD_TOKEN\"",
                ClientConfig::default_path().display()
            )
        })?;
        secret::resolve(raw).map_err(|e| format!("failed to resolve discord.token: {}", e))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("econcal")
    }

    /// Builds the engine configuration.
    ///
    /// Fails when the guild id is missing or not a snowflake, or when the
    /// interval or a timeout is zero.
    pub fn to_sync_config(&self) -> Result<SyncConfig, String> {
        let guild_id = self
            .sync
            .guild_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "sync.guild_id is not set (use --guild-id or [sync] guild_id)".to_string())?;
        if !guild_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("sync.guild_id `{}` is not a Discord snowflake", guild_id));
        }
        if self.sync.interval_hours == 0 {
            return Err("sync.interval_hours must be at least 1".to_string());
        }
        if self.sync.source_timeout_secs == 0 || self.sync.store_timeout_secs == 0 {
            return Err("timeouts must be at least 1 second".to_string());
        }

        Ok(SyncConfig::new(guild_id)
            .with_horizon_days(self.sync.horizon_days)
            .with_include_past(self.sync.include_past)
            .with_interval(Duration::from_secs(self.sync.interval_hours * 60 * 60))
            .with_source_timeout(Duration::from_secs(self.sync.source_timeout_secs))
            .with_store_timeout(Duration::from_secs(self.sync.store_timeout_secs))
            .with_location(self.sync.location.clone()))
    }

    /// Lock file guarding cycles for `guild_id`.
    pub fn lock_path(&self, guild_id: &str) -> PathBuf {
        self.sync
            .lock_file
            .clone()
            .unwrap_or_else(|| default_lock_path(guild_id))
    }

    /// Checks everything that can be checked without network access.
    /// Secrets are not resolved here.
    pub fn check(&self) -> Result<(), String> {
        self.to_sync_config()?;

        let endpoint = self
            .source
            .endpoint()
            .ok_or_else(|| format!("source.url is required for `{}`", self.source.kind))?;
        url::Url::parse(&endpoint).map_err(|e| format!("invalid source.url `{}`: {}", endpoint, e))?;

        if self.source.kind == SourceKind::Finnhub && self.source.api_key.is_none() {
            return Err("source.api_key is required for `finnhub`".to_string());
        }
        if self.discord.token.is_none() {
            return Err("discord.token is not set".to_string());
        }
        Ok(())
    }

    /// Copy suitable for printing: literal secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.source.api_key = config.source.api_key.as_deref().map(secret::mask);
        config.discord.token = config.discord.token.as_deref().map(secret::mask);
        config
    }
}
