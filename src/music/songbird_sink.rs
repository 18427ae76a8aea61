//! [`VoiceSink`] backed by a songbird voice manager.

use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId};
use songbird::input::YoutubeDl;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::SinkError;
use super::event_handlers::{ControllerHandle, TrackEndNotifier, TrackErrorNotifier};
use super::sink::VoiceSink;
use super::track::{ChannelKey, GuildKey, PlaybackId, Track};

/// Streams tracks through `yt-dlp` into the guild's voice call.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http_client: reqwest::Client,
    ytdlp: &'static str,
    handle: ControllerHandle,
    tracks: DashMap<GuildKey, TrackHandle>,
}

impl SongbirdSink {
    pub fn new(
        manager: Arc<Songbird>,
        http_client: reqwest::Client,
        ytdlp: String,
        handle: ControllerHandle,
    ) -> Self {
        Self {
            manager,
            http_client,
            // songbird wants a static program name; the sink lives for the whole process.
            ytdlp: Box::leak(ytdlp.into_boxed_str()),
            handle,
            tracks: DashMap::new(),
        }
    }

    fn track_handle(&self, guild: GuildKey) -> Result<TrackHandle, SinkError> {
        self.tracks
            .get(&guild)
            .map(|h| h.clone())
            .ok_or(SinkError::NotConnected)
    }

    async fn play_mode(&self, guild: GuildKey) -> Option<PlayMode> {
        let handle = self.tracks.get(&guild).map(|h| h.clone())?;
        handle.get_info().await.ok().map(|info| info.playing)
    }
}

fn guild_id(guild: GuildKey) -> GuildId {
    GuildId::new(guild.0)
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    async fn connect(&self, guild: GuildKey, channel: ChannelKey) -> Result<(), SinkError> {
        self.manager
            .join(guild_id(guild), ChannelId::new(channel.0))
            .await
            .map_err(|e| SinkError::Connect(e.to_string()))?;
        info!(%guild, "Joined voice channel {}", channel);
        Ok(())
    }

    async fn play(&self, guild: GuildKey, track: &Track, playback: PlaybackId) -> Result<(), SinkError> {
        let call = self
            .manager
            .get(guild_id(guild))
            .ok_or(SinkError::NotConnected)?;

        let source = YoutubeDl::new_ytdl_like(
            self.ytdlp,
            self.http_client.clone(),
            track.stream_ref.clone(),
        );

        let track_handle = {
            let mut handler = call.lock().await;
            handler.play_only_input(source.into())
        };
        debug!(%guild, %playback, "Track handle created for: {}", track.title);

        track_handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    guild,
                    playback,
                    handle: self.handle.clone(),
                },
            )
            .map_err(|e| SinkError::Stream(e.to_string()))?;
        track_handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier {
                    guild,
                    playback,
                    handle: self.handle.clone(),
                },
            )
            .map_err(|e| SinkError::Stream(e.to_string()))?;

        self.tracks.insert(guild, track_handle);
        Ok(())
    }

    async fn pause(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.track_handle(guild)?
            .pause()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn resume(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.track_handle(guild)?
            .play()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn stop(&self, guild: GuildKey) -> Result<(), SinkError> {
        let Some((_, track)) = self.tracks.remove(&guild) else {
            return Ok(());
        };
        match track.stop() {
            Ok(()) | Err(songbird::error::ControlError::Finished) => Ok(()),
            Err(e) => Err(SinkError::Control(e.to_string())),
        }
    }

    async fn disconnect(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.tracks.remove(&guild);
        if self.manager.get(guild_id(guild)).is_none() {
            return Err(SinkError::NotConnected);
        }
        self.manager
            .remove(guild_id(guild))
            .await
            .map_err(|e| SinkError::Connect(e.to_string()))?;
        info!(%guild, "Left voice channel");
        Ok(())
    }

    async fn is_playing(&self, guild: GuildKey) -> bool {
        self.play_mode(guild).await == Some(PlayMode::Play)
    }

    async fn is_paused(&self, guild: GuildKey) -> bool {
        self.play_mode(guild).await == Some(PlayMode::Pause)
    }
}
