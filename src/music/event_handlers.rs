//! Events consumed by the playback controller, the handle used to submit
//! them, and the songbird notifiers that turn track lifecycle callbacks into
//! events.

use poise::serenity_prelude::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::audio_sources::{AudioSourceResult, ResolvedSet};
use super::error::{MusicError, MusicResult};
use super::music_manager::{Notice, Reply};
use super::queue_manager::GuildPlaybackState;
use super::track::{ChannelKey, GuildKey, PlaybackId};

/// A user-issued operation on a guild's playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play {
        voice_channel: ChannelKey,
        query: String,
    },
    Pause,
    Resume,
    Skip,
    Stop,
    ClearQueue,
    Refresh,
    SetChannel(ChannelKey),
}

/// Everything that can change playback state.
#[derive(Debug)]
pub enum ControllerEvent {
    Command {
        guild: GuildKey,
        command: Command,
        reply: Reply,
    },
    /// A background resolution finished. `session` is the guild's session at
    /// the time the request was accepted.
    Resolved {
        guild: GuildKey,
        session: u64,
        result: AudioSourceResult<ResolvedSet>,
        reply: Reply,
    },
    /// Read a copy of a guild's state without changing it.
    Inspect {
        guild: GuildKey,
        reply: oneshot::Sender<Option<GuildPlaybackState>>,
    },
    TrackFinished {
        guild: GuildKey,
        playback: PlaybackId,
    },
    PlaybackFailed {
        guild: GuildKey,
        playback: PlaybackId,
        reason: String,
    },
    Shutdown,
}

pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

/// Create a handle and the receiving end the controller runs on.
pub fn channel() -> (ControllerHandle, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControllerHandle { tx }, rx)
}

/// Cloneable entry point to the playback controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    async fn request(&self, guild: GuildKey, command: Command) -> MusicResult<Notice> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControllerEvent::Command {
                guild,
                command,
                reply,
            })
            .map_err(|_| MusicError::ControllerGone)?;
        response.await.map_err(|_| MusicError::ControllerGone)?
    }

    /// Resolve `query` and queue the result. Completes once the tracks are
    /// queued or playing.
    pub async fn play(
        &self,
        guild: GuildKey,
        voice_channel: ChannelKey,
        query: impl Into<String>,
    ) -> MusicResult<Notice> {
        self.request(
            guild,
            Command::Play {
                voice_channel,
                query: query.into(),
            },
        )
        .await
    }

    pub async fn pause(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::Pause).await
    }

    pub async fn resume(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::Resume).await
    }

    pub async fn skip(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::Skip).await
    }

    pub async fn stop(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::Stop).await
    }

    pub async fn clear_queue(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::ClearQueue).await
    }

    pub async fn refresh(&self, guild: GuildKey) -> MusicResult<Notice> {
        self.request(guild, Command::Refresh).await
    }

    pub async fn set_channel(&self, guild: GuildKey, channel: ChannelKey) -> MusicResult<Notice> {
        self.request(guild, Command::SetChannel(channel)).await
    }

    /// Snapshot of a guild's queue and status, `None` for an unseen guild.
    pub async fn state(&self, guild: GuildKey) -> MusicResult<Option<GuildPlaybackState>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControllerEvent::Inspect { guild, reply })
            .map_err(|_| MusicError::ControllerGone)?;
        response.await.map_err(|_| MusicError::ControllerGone)
    }

    pub(crate) fn resolved(
        &self,
        guild: GuildKey,
        session: u64,
        result: AudioSourceResult<ResolvedSet>,
        reply: Reply,
    ) {
        if self
            .tx
            .send(ControllerEvent::Resolved {
                guild,
                session,
                result,
                reply,
            })
            .is_err()
        {
            warn!(%guild, "Controller stopped before resolution finished");
        }
    }

    /// Report that a playback reached its end.
    pub fn track_finished(&self, guild: GuildKey, playback: PlaybackId) {
        self.post(ControllerEvent::TrackFinished { guild, playback });
    }

    /// Report that a playback died with an error.
    pub fn playback_failed(&self, guild: GuildKey, playback: PlaybackId, reason: impl Into<String>) {
        self.post(ControllerEvent::PlaybackFailed {
            guild,
            playback,
            reason: reason.into(),
        });
    }

    /// Ask the controller loop to exit.
    pub fn shutdown(&self) {
        self.post(ControllerEvent::Shutdown);
    }

    fn post(&self, event: ControllerEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!("Dropping event, controller is gone: {:?}", err.0);
        }
    }
}

/// Posts `TrackFinished` when songbird reports the end of a track.
pub struct TrackEndNotifier {
    pub guild: GuildKey,
    pub playback: PlaybackId,
    pub handle: ControllerHandle,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(_) = ctx {
            debug!(guild = %self.guild, playback = %self.playback, "Track ended");
            self.handle.track_finished(self.guild, self.playback);
        }
        None
    }
}

/// Posts `PlaybackFailed` when songbird reports a track error.
pub struct TrackErrorNotifier {
    pub guild: GuildKey,
    pub playback: PlaybackId,
    pub handle: ControllerHandle,
}

#[async_trait]
impl songbird::EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let reason = tracks
                .first()
                .map(|(state, _)| format!("{:?}", state.playing))
                .unwrap_or_else(|| "unknown track error".to_string());
            self.handle.playback_failed(self.guild, self.playback, reason);
        }
        None
    }
}
