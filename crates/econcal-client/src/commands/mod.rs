//! Subcommand implementations and the wiring they share.

pub mod config;
pub mod run;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use econcal_core::SourceKind;
use econcal_providers::{HttpSourceConfig, SourceAdapter, SourceError};
use econcal_sync::{DiscordConfig, DiscordStore, StoreClient, SyncRunner};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds the configured source adapter.
pub fn build_source(config: &ClientConfig) -> ClientResult<Arc<dyn SourceAdapter>> {
    let settings = &config.source;
    let endpoint = settings.endpoint().ok_or_else(|| {
        ClientError::Config(format!("source.url is required for `{}`", settings.kind))
    })?;

    let mut http = HttpSourceConfig::new(&endpoint)
        .map_err(|e| ClientError::Config(format!("invalid source.url `{}`: {}", endpoint, e)))?
        .with_timeout(Duration::from_secs(config.sync.source_timeout_secs));
    if let Some(api_key) = settings.resolve_api_key().map_err(ClientError::Config)? {
        http = http.with_api_key(api_key);
    }

    debug!(kind = %settings.kind, "Building source");
    let source: Arc<dyn SourceAdapter> = match settings.kind {
        #[cfg(feature = "finnhub")]
        SourceKind::Finnhub => Arc::new(econcal_providers::FinnhubSource::new(http)?),
        #[cfg(feature = "scrape")]
        SourceKind::ScrapedHtml => Arc::new(econcal_providers::ScrapedHtmlSource::new(http)?),
        #[cfg(feature = "json-feed")]
        SourceKind::JsonFeed => Arc::new(econcal_providers::JsonFeedSource::new(http)?),
        #[cfg(feature = "rss")]
        SourceKind::Rss => Arc::new(econcal_providers::RssSource::new(http)?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(SourceError::configuration(format!(
                "source `{}` is not compiled into this build",
                other
            ))
            .into());
        }
    };
    Ok(source)
}

/// Builds the Discord store from the resolved bot token.
pub fn build_store(config: &ClientConfig) -> ClientResult<Arc<dyn StoreClient>> {
    let token = config.discord.resolve_token().map_err(ClientError::Config)?;

    let mut discord = DiscordConfig::new(token)
        .with_timeout(Duration::from_secs(config.sync.store_timeout_secs));
    if let Some(ref api_base) = config.discord.api_base {
        discord = discord.with_api_base(api_base.clone());
    }
    Ok(Arc::new(DiscordStore::new(discord)?))
}

/// Builds a runner with the configured source, store and engine settings.
///
/// Cycles hold the guild's lock file, so `run` and `sync` never write to
/// the same guild at once.
pub fn build_runner(config: &ClientConfig) -> ClientResult<SyncRunner> {
    let sync_config = config.to_sync_config().map_err(ClientError::Config)?;
    let lock_path = config.lock_path(&sync_config.guild_id);
    let source = build_source(config)?;
    let store = build_store(config)?;
    debug!(lock = %lock_path.display(), "Building runner");
    Ok(SyncRunner::new(source, store, sync_config).with_lock_file(lock_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use econcal_sync::SyncError;

    fn config(kind: SourceKind, url: Option<&str>) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.sync.guild_id = Some("123456789012345678".to_string());
        config.source.kind = kind;
        config.source.url = url.map(str::to_string);
        config.source.api_key = Some("key".to_string());
        config.discord.token = Some("token".to_string());
        config
    }

    #[cfg(feature = "rss")]
    #[test]
    fn builds_configured_source() {
        let source = build_source(&config(
            SourceKind::Rss,
            Some("https://calendar.example.com/feed.xml"),
        ))
        .unwrap();
        assert_eq!(source.kind(), SourceKind::Rss);
    }

    #[cfg(feature = "scrape")]
    #[test]
    fn scraped_source_without_url_is_a_config_error() {
        let result = build_source(&config(SourceKind::ScrapedHtml, None));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn store_requires_token() {
        let mut config = config(SourceKind::JsonFeed, None);
        config.discord.token = None;
        assert!(matches!(build_store(&config), Err(ClientError::Config(_))));
    }

    #[cfg(feature = "json-feed")]
    #[test]
    fn runner_uses_sync_settings() {
        let mut config = config(SourceKind::JsonFeed, None);
        config.sync.horizon_days = 3;
        let runner = build_runner(&config).unwrap();
        assert_eq!(runner.config().horizon_days, 3);
        assert_eq!(runner.config().guild_id, "123456789012345678");
    }

    #[cfg(feature = "json-feed")]
    #[test]
    fn runner_rejects_zero_interval() {
        let mut config = config(SourceKind::JsonFeed, None);
        config.sync.interval_hours = 0;
        let err = build_runner(&config).err().unwrap();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("interval_hours")));
    }

    #[cfg(feature = "json-feed")]
    #[tokio::test]
    async fn cycle_is_skipped_while_lock_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("guild.lock");
        let mut config = config(SourceKind::JsonFeed, None);
        config.sync.lock_file = Some(lock.clone());

        let _held = econcal_sync::CycleLock::acquire(&lock).unwrap();
        let runner = build_runner(&config).unwrap();
        let result = runner.run_cycle().await;
        assert!(matches!(result, Err(SyncError::AlreadyRunning)));
    }
}
