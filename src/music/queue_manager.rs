//! Per-guild playback state and the store that owns it.
//!
//! Nothing in here performs I/O or talks to the voice sink; the playback
//! controller drives these transitions and does the side effects.

use super::track::{ChannelKey, GuildKey, MessageKey, PlaybackId, Track};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Everything the bot remembers about one guild.
#[derive(Debug, Clone, Default)]
pub struct GuildPlaybackState {
    pub pending_queue: VecDeque<Track>,
    pub current_track: Option<Track>,
    pub status_channel: Option<ChannelKey>,
    pub status_message: Option<MessageKey>,
    /// Identifies the playback started for `current_track`.
    pub playback: Option<PlaybackId>,
    /// Bumped whenever the queue is wiped, invalidating in-flight resolutions.
    pub session: u64,
}

impl GuildPlaybackState {
    fn new(default_channel: Option<ChannelKey>) -> Self {
        Self {
            status_channel: default_channel,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_track.is_none()
    }
}

/// Owns the mapping from guild to playback state.
#[derive(Debug, Default)]
pub struct GuildQueueStore {
    guilds: HashMap<GuildKey, GuildPlaybackState>,
    default_channel: Option<ChannelKey>,
}

impl GuildQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose guilds start out with `channel` as their status channel.
    pub fn with_default_channel(channel: Option<ChannelKey>) -> Self {
        Self {
            guilds: HashMap::new(),
            default_channel: channel,
        }
    }

    /// Get the state for a guild, creating it on first use
    pub fn get_or_create(&mut self, guild: GuildKey) -> &mut GuildPlaybackState {
        let default_channel = self.default_channel;
        self.guilds.entry(guild).or_insert_with(|| {
            debug!(%guild, "Creating playback state");
            GuildPlaybackState::new(default_channel)
        })
    }

    /// Read-only view; `None` if the guild never interacted with the bot.
    pub fn get(&self, guild: GuildKey) -> Option<&GuildPlaybackState> {
        self.guilds.get(&guild)
    }

    /// Append a track and return its 1-based position in the queue.
    pub fn enqueue(&mut self, guild: GuildKey, track: Track) -> usize {
        let state = self.get_or_create(guild);
        state.pending_queue.push_back(track);
        state.pending_queue.len()
    }

    pub fn set_current(&mut self, guild: GuildKey, track: Option<Track>) {
        let state = self.get_or_create(guild);
        if track.is_none() {
            state.playback = None;
        }
        state.current_track = track;
    }

    /// Remove and return the head of the queue. Leaves `current_track` alone.
    pub fn pop_next(&mut self, guild: GuildKey) -> Option<Track> {
        self.guilds
            .get_mut(&guild)
            .and_then(|state| state.pending_queue.pop_front())
    }

    /// Empty the queue and drop the current track.
    pub fn clear(&mut self, guild: GuildKey) {
        let state = self.get_or_create(guild);
        state.pending_queue.clear();
        state.current_track = None;
        state.playback = None;
        state.session += 1;
    }

    /// Empty the queue but keep whatever is playing.
    pub fn clear_pending(&mut self, guild: GuildKey) {
        let state = self.get_or_create(guild);
        state.pending_queue.clear();
        state.session += 1;
    }

    pub fn session(&mut self, guild: GuildKey) -> u64 {
        self.get_or_create(guild).session
    }

    pub fn len(&self, guild: GuildKey) -> usize {
        self.get(guild).map_or(0, |state| state.pending_queue.len())
    }

    pub fn is_empty(&self, guild: GuildKey) -> bool {
        self.len(guild) == 0
    }
}
