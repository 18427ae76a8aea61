//! The `Track` value type and the opaque keys the music subsystem is indexed by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::error::ResolutionError;

/// Identifies a guild. Each guild owns an independent playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildKey(pub u64);

/// Identifies a text or voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey(pub u64);

/// Identifies a message previously sent to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageKey(pub u64);

/// Tags one started playback so late finish/failure notifications can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl fmt::Display for GuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved, playable unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Display name; never empty.
    pub title: String,
    /// Page URL or provider handle the voice sink opens the audio from.
    pub stream_ref: String,
    /// Endless/live stream. Its end is not evidence of natural completion.
    pub is_live: bool,
    /// What the user typed, kept for diagnostics.
    pub source_query: String,
    /// The duration of the track, if the provider reported one.
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,
}

impl Track {
    /// Builds a track, falling back to the raw query when the provider gave no title.
    ///
    /// Fails with `NoStream` when `stream_ref` is blank, so a track without a
    /// stream can never be queued.
    pub fn new(
        title: Option<&str>,
        stream_ref: &str,
        is_live: bool,
        source_query: &str,
    ) -> Result<Self, ResolutionError> {
        let stream_ref = stream_ref.trim();
        if stream_ref.is_empty() {
            return Err(ResolutionError::NoStream(source_query.to_string()));
        }

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ if !source_query.trim().is_empty() => source_query.trim().to_string(),
            _ => stream_ref.to_string(),
        };

        Ok(Self {
            title,
            stream_ref: stream_ref.to_string(),
            is_live,
            source_query: source_query.to_string(),
            duration: None,
        })
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }
}
