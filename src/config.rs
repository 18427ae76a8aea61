//! Runtime configuration read from the environment (and `.env`).

use humantime_serde::re::humantime;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::music::audio_sources::ResolverSettings;
use crate::music::track::ChannelKey;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Everything the bot needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub discord_token: String,
    pub assigned_channel: Option<ChannelKey>,
    pub dj_role_name: String,
    pub ytdlp_path: String,
    pub resolver: ResolverSettings,
    pub spotify: Option<SpotifyConfig>,
    pub search_enabled: bool,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Older `.env` files name the token DISCORD_BOT_TOKEN
        let discord_token = get("DISCORD_TOKEN")
            .or_else(|| get("DISCORD_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let assigned_channel = get("ASSIGNED_CHANNEL_ID")
            .map(|v| parse::<u64>("ASSIGNED_CHANNEL_ID", &v))
            .transpose()?
            .map(ChannelKey);

        let defaults = ResolverSettings::default();
        let resolver = ResolverSettings {
            attempts: parse_or("RESOLVE_RETRIES", get("RESOLVE_RETRIES"), defaults.attempts)?.max(1),
            attempt_timeout: match get("RESOLVE_TIMEOUT") {
                Some(v) => parse_duration("RESOLVE_TIMEOUT", &v)?,
                None => defaults.attempt_timeout,
            },
            workers: parse_or("RESOLVER_WORKERS", get("RESOLVER_WORKERS"), defaults.workers)?.max(1),
            max_playlist_entries: parse_or(
                "MAX_PLAYLIST_ENTRIES",
                get("MAX_PLAYLIST_ENTRIES"),
                defaults.max_playlist_entries,
            )?,
            ..defaults
        };

        let spotify = match (get("SPOTIFY_CLIENT_ID"), get("SPOTIFY_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            discord_token,
            assigned_channel,
            dj_role_name: get("DJ_ROLE_NAME").unwrap_or_else(|| "DJ".to_string()),
            ytdlp_path: get("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            resolver,
            spotify,
            search_enabled: parse_or("SEARCH_ENABLED", get("SEARCH_ENABLED"), true)?,
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |v| parse(name, &v))
}

fn parse_duration(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
