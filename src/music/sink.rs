//! Interfaces to the collaborators the playback controller drives: the voice
//! transport and the text channel that hosts the status message.

use async_trait::async_trait;

use super::error::{ChannelError, SinkError};
use super::track::{ChannelKey, GuildKey, MessageKey, PlaybackId, Track};

/// Audio output for a guild's voice connection.
///
/// `play` does not take a callback. Implementations report the end of a
/// playback by posting `ControllerEvent::TrackFinished` (or `PlaybackFailed`)
/// tagged with the `PlaybackId` they were given.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceSink: Send + Sync {
    async fn connect(&self, guild: GuildKey, channel: ChannelKey) -> Result<(), SinkError>;

    async fn play(&self, guild: GuildKey, track: &Track, playback: PlaybackId)
    -> Result<(), SinkError>;

    async fn pause(&self, guild: GuildKey) -> Result<(), SinkError>;

    async fn resume(&self, guild: GuildKey) -> Result<(), SinkError>;

    async fn stop(&self, guild: GuildKey) -> Result<(), SinkError>;

    async fn disconnect(&self, guild: GuildKey) -> Result<(), SinkError>;

    async fn is_playing(&self, guild: GuildKey) -> bool;

    async fn is_paused(&self, guild: GuildKey) -> bool;
}

/// Interactive controls attached to the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlButton {
    Pause,
    Resume,
    Skip,
    Stop,
}

impl ControlButton {
    pub const ALL: [ControlButton; 4] = [
        ControlButton::Pause,
        ControlButton::Resume,
        ControlButton::Skip,
        ControlButton::Stop,
    ];

    /// The component id carried by the button.
    pub fn custom_id(self) -> &'static str {
        match self {
            ControlButton::Pause => "aquapod_pause",
            ControlButton::Resume => "aquapod_resume",
            ControlButton::Skip => "aquapod_skip",
            ControlButton::Stop => "aquapod_stop",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.custom_id() == id)
    }
}

/// The text channel hosting status messages and notices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(
        &self,
        channel: ChannelKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<MessageKey, ChannelError>;

    async fn edit(
        &self,
        channel: ChannelKey,
        message: MessageKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<(), ChannelError>;

    async fn delete(&self, channel: ChannelKey, message: MessageKey) -> Result<(), ChannelError>;
}
