//! Error taxonomy for the music subsystem.
//!
//! `MusicError` is what reaches the command boundary; the narrower enums are
//! what the resolver, the voice sink and the message channel return.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the command layer.
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to resolve track: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Playback failed: {0}")]
    PlaybackSink(#[from] SinkError),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("No status channel configured")]
    ChannelNotConfigured,

    #[error("Status message error: {0}")]
    StatusMessage(#[from] ChannelError),

    #[error("Playback controller is not running")]
    ControllerGone,
}

impl MusicError {
    /// The text shown to the user when this error ends a command.
    pub fn user_message(&self) -> String {
        match self {
            MusicError::NotInGuild => "This command can only be used in a server.".to_string(),
            MusicError::UserNotInVoiceChannel => {
                "You need to be in a voice channel to play music.".to_string()
            }
            MusicError::InvalidQuery(_) | MusicError::Resolution(ResolutionError::InvalidQuery(_)) => {
                "Invalid URL. Please provide a valid YouTube link or search text.".to_string()
            }
            MusicError::Resolution(err) => format!("Failed to resolve that request: {}", err),
            MusicError::PlaybackSink(err) => format!("Playback error: {}", err),
            MusicError::PermissionDenied => {
                "You need to be a DJ or admin to use this command.".to_string()
            }
            MusicError::ChannelNotConfigured => {
                "No channel is set for the bot. Use the /set_channel command to set one."
                    .to_string()
            }
            MusicError::StatusMessage(err) => format!("Could not update the status message: {}", err),
            MusicError::ControllerGone => "The music player is shutting down.".to_string(),
        }
    }
}

/// Errors produced while turning a query into playable tracks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("unsupported link or search text: {0}")]
    InvalidQuery(String),

    #[error("no playable stream for {0}")]
    NoStream(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not parse provider output: {0}")]
    Parse(String),

    #[error("playlist has no playable entries")]
    EmptyPlaylist,
}

/// Errors reported by the voice transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("not connected to a voice channel")]
    NotConnected,

    #[error("failed to join voice channel: {0}")]
    Connect(String),

    #[error("could not obtain a stream: {0}")]
    Stream(String),

    #[error("track control failed: {0}")]
    Control(String),
}

/// Errors reported when sending, editing or deleting channel messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("failed to send message: {0}")]
    Send(String),

    #[error("failed to edit message: {0}")]
    Edit(String),

    #[error("failed to delete message: {0}")]
    Delete(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;
