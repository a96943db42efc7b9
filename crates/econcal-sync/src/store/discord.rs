//! Discord guild scheduled events over the REST API.
//!
//! - `GET  /guilds/{guild_id}/scheduled-events` lists events
//! - `POST /guilds/{guild_id}/scheduled-events` creates one
//!
//! Events are created as external (`entity_type = 3`) and guild-only
//! (`privacy_level = 2`); external events require an end time and a
//! location in `entity_metadata`.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use econcal_providers::BoxFuture;

use super::{EventId, EventPrivacy, ExistingEvents, NewScheduledEvent, StoreClient};
use crate::error::{StoreError, StoreResult};

/// Default API base.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// `GUILD_ONLY`.
const PRIVACY_LEVEL_GUILD_ONLY: u8 = 2;

/// `EXTERNAL`.
const ENTITY_TYPE_EXTERNAL: u8 = 3;

/// Configuration for the Discord store.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// API base URL, without trailing slash.
    pub api_base: String,

    /// Bot token, sent as `Authorization: Bot <token>`.
    pub token: String,

    /// Per-request timeout.
    pub timeout: Duration,

    pub user_agent: String,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(15),
            user_agent: format!(
                "DiscordBot (https://github.com/econcal/econcal, {})",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn events_url(&self, guild_id: &str) -> String {
        format!("{}/guilds/{}/scheduled-events", self.api_base, guild_id)
    }
}

/// Store client for Discord guild scheduled events.
#[derive(Debug)]
pub struct DiscordStore {
    client: Client,
    config: DiscordConfig,
}

impl DiscordStore {
    pub fn new(config: DiscordConfig) -> StoreResult<Self> {
        if config.token.trim().is_empty() {
            return Err(StoreError::unauthorized("Discord bot token is empty"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| StoreError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.token)
    }

    async fn list(&self, guild_id: &str) -> StoreResult<ExistingEvents> {
        let url = self.config.events_url(guild_id);
        trace!(url = %url, "Listing scheduled events");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(request_error)?;

        let body = handle_response(response).await?;
        parse_listing(&body)
    }

    async fn create(&self, guild_id: &str, event: &NewScheduledEvent) -> StoreResult<EventId> {
        let url = self.config.events_url(guild_id);
        let payload = CreatePayload::from_request(event);
        let body = serde_json::to_string(&payload)
            .map_err(|e| StoreError::validation(format!("Failed to encode event: {}", e)))?;

        trace!(url = %url, name = %event.name, "Creating scheduled event");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(request_error)?;

        let body = handle_response(response).await?;
        let created: CreatedEvent = serde_json::from_str(&body).map_err(|e| {
            StoreError::invalid_response(format!("Malformed create response: {}", e))
        })?;
        debug!(id = %created.id, name = %event.name, "Scheduled event created");
        Ok(created.id)
    }
}

impl StoreClient for DiscordStore {
    fn name(&self) -> &str {
        "discord"
    }

    fn list_existing_events<'a>(
        &'a self,
        guild_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<ExistingEvents>> {
        Box::pin(self.list(guild_id))
    }

    fn create_event<'a>(
        &'a self,
        guild_id: &'a str,
        event: &'a NewScheduledEvent,
    ) -> BoxFuture<'a, StoreResult<EventId>> {
        Box::pin(self.create(guild_id, event))
    }
}

/// Wire format of a create request.
#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    name: &'a str,
    privacy_level: u8,
    scheduled_start_time: String,
    scheduled_end_time: String,
    description: &'a str,
    entity_type: u8,
    entity_metadata: EntityMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct EntityMetadata<'a> {
    location: &'a str,
}

impl<'a> CreatePayload<'a> {
    fn from_request(event: &'a NewScheduledEvent) -> Self {
        let privacy_level = match event.privacy {
            EventPrivacy::GuildOnly => PRIVACY_LEVEL_GUILD_ONLY,
        };
        Self {
            name: &event.name,
            privacy_level,
            scheduled_start_time: format_timestamp(event.start_time),
            scheduled_end_time: format_timestamp(event.end_time),
            description: &event.description,
            entity_type: ENTITY_TYPE_EXTERNAL,
            entity_metadata: EntityMetadata {
                location: &event.location,
            },
        }
    }
}

/// The fields of a listed event that matching needs.
#[derive(Debug, Deserialize)]
struct ListedEvent {
    name: String,
    scheduled_start_time: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a listing body into name/start pairs.
///
/// Entries with an unparsable start are skipped: they can never equal a
/// candidate's start, so the candidate would be created either way.
fn parse_listing(body: &str) -> StoreResult<ExistingEvents> {
    let listed: Vec<ListedEvent> = serde_json::from_str(body)
        .map_err(|e| StoreError::invalid_response(format!("Malformed event listing: {}", e)))?;

    let mut existing = ExistingEvents::new();
    for event in listed {
        match DateTime::parse_from_rfc3339(&event.scheduled_start_time) {
            Ok(start) => existing.insert(event.name, start.with_timezone(&Utc)),
            Err(e) => warn!(
                name = %event.name,
                start = %event.scheduled_start_time,
                error = %e,
                "Ignoring listed event with unparsable start time"
            ),
        }
    }
    Ok(existing)
}

fn request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::timeout(format!("Request timed out: {}", e))
    } else {
        StoreError::network(format!("Request failed: {}", e))
    }
}

/// Maps the response status to a [`StoreError`] and returns the body on success.
async fn handle_response(response: Response) -> StoreResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        s if s.is_success() => response
            .text()
            .await
            .map_err(|e| StoreError::network(format!("Failed to read response: {}", e))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::unauthorized(
            format!("Access denied ({}): check the bot token and its permissions", status),
        )),
        StatusCode::NOT_FOUND => Err(StoreError::not_found("Unknown guild")),
        StatusCode::TOO_MANY_REQUESTS => {
            let body = response.text().await.unwrap_or_default();
            let retry_after = serde_json::from_str::<RateLimitBody>(&body)
                .ok()
                .and_then(|b| b.retry_after);
            Err(match retry_after {
                Some(secs) => StoreError::rate_limited(format!("Rate limited, retry after {:.1}s", secs)),
                None => StoreError::rate_limited("Rate limited"),
            })
        }
        StatusCode::BAD_REQUEST => {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::validation(format!("Rejected by Discord: {}", body)))
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::server(format!("Server error ({}): {}", s, body)))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            Err(StoreError::invalid_response(format!(
                "Unexpected status {}: {}",
                s, body
            )))
        }
    }
}
