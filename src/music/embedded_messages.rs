//! The persistent status message and the short notices sent back to users.
//!
//! [`render`] is a pure projection of a guild's state. [`sync`] reconciles
//! that projection with the message already in the channel: edit it if it is
//! still there, otherwise send a new one and remember its id.

use std::time::Duration;
use tracing::debug;

use super::error::MusicError;
use super::queue_manager::GuildPlaybackState;
use super::sink::{ControlButton, MessageChannel};
use super::track::{ChannelKey, MessageKey, Track};

/// Number of queued entries listed before collapsing into a count.
pub const QUEUE_PREVIEW_LEN: usize = 5;

/// Format a duration into a human-readable string (e.g., "3:45" or "1:23:45")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn describe(track: &Track) -> String {
    match (track.is_live, track.duration) {
        (true, _) => format!("{} (live)", track.title),
        (false, Some(duration)) => format!("{} `{}`", track.title, format_duration(duration)),
        (false, None) => track.title.clone(),
    }
}

/// Render the status text for a guild.
pub fn render(state: &GuildPlaybackState) -> String {
    let now_playing = state
        .current_track
        .as_ref()
        .map_or_else(|| "Nothing".to_string(), describe);

    let mut content = format!("**Now Playing:** {}\n\n**Queue:**\n", now_playing);

    if state.pending_queue.is_empty() {
        content.push_str("The queue is currently empty.");
        return content;
    }

    for (idx, track) in state.pending_queue.iter().take(QUEUE_PREVIEW_LEN).enumerate() {
        content.push_str(&format!("{}. {}\n", idx + 1, describe(track)));
    }

    let remaining = state.pending_queue.len().saturating_sub(QUEUE_PREVIEW_LEN);
    if remaining > 0 {
        content.push_str(&format!("...and {} more.", remaining));
    }

    content.trim_end().to_string()
}

/// Buttons attached to the status message.
pub fn controls() -> &'static [ControlButton] {
    &ControlButton::ALL
}

/// Edit the existing status message, or send a new one if there is none or it
/// can no longer be edited.
pub async fn sync(
    state: &mut GuildPlaybackState,
    channel: &dyn MessageChannel,
) -> Result<MessageKey, MusicError> {
    let channel_key = state.status_channel.ok_or(MusicError::ChannelNotConfigured)?;
    let content = render(state);

    if let Some(message) = state.status_message {
        match channel.edit(channel_key, message, &content, controls()).await {
            Ok(()) => return Ok(message),
            Err(err) => {
                debug!("Failed to update existing message, sending new one: {}", err);
                state.status_message = None;
            }
        }
    }

    let message = channel.send(channel_key, &content, controls()).await?;
    state.status_message = Some(message);
    Ok(message)
}

/// Delete the status message (best effort) and send a fresh one.
pub async fn refresh(
    state: &mut GuildPlaybackState,
    channel: &dyn MessageChannel,
) -> Result<MessageKey, MusicError> {
    discard(state, channel).await;
    sync(state, channel).await
}

/// Move the status message to another channel.
pub async fn reassign(
    state: &mut GuildPlaybackState,
    new_channel: ChannelKey,
    channel: &dyn MessageChannel,
) -> Result<MessageKey, MusicError> {
    discard(state, channel).await;
    state.status_channel = Some(new_channel);
    sync(state, channel).await
}

/// Forget the current status message, deleting it if possible.
async fn discard(state: &mut GuildPlaybackState, channel: &dyn MessageChannel) {
    let Some(message) = state.status_message.take() else {
        return;
    };
    if let Some(channel_key) = state.status_channel {
        if let Err(err) = channel.delete(channel_key, message).await {
            debug!("Ignoring failure to delete status message: {}", err);
        }
    }
}

pub fn now_playing(track: &Track) -> String {
    if track.is_live {
        format!("Now playing (live): {}", track.title)
    } else {
        format!("Now playing: {}", track.title)
    }
}

pub fn added_to_queue(track: &Track, position: usize) -> String {
    format!("Added to queue: {} (position {})", track.title, position)
}

pub fn playlist_added(title: Option<&str>, count: usize, skipped: usize) -> String {
    let name = title.unwrap_or("playlist");
    match skipped {
        0 => format!("Added {} tracks from {}.", count, name),
        _ => format!(
            "Added {} tracks from {} ({} could not be loaded).",
            count, name, skipped
        ),
    }
}

pub fn failed_to_play(track: &Track) -> String {
    format!("Failed to play {}", track.title)
}

pub fn channel_set(channel: ChannelKey) -> String {
    format!("The bot channel has been set to <#{}>.", channel)
}

pub const PAUSED: &str = "Paused the playback.";
pub const RESUMED: &str = "Resumed the playback.";
pub const SKIPPED: &str = "Skipped the current track.";
pub const STOPPED: &str = "Stopped the playback and cleared the queue.";
pub const CLEARED: &str = "Cleared the queue.";
pub const REFRESHED: &str = "The persistent queue message has been refreshed.";
pub const NOTHING_PLAYING: &str = "No audio is currently playing.";
pub const NOTHING_PAUSED: &str = "No audio is paused.";
pub const STOPPED_WHILE_RESOLVING: &str =
    "The queue was stopped or cleared while that request was loading, so it was not added.";
