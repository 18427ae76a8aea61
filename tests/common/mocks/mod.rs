//! In-memory stand-ins for the voice transport, the text channel and the
//! media provider.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

use aquapod::music::audio_sources::{
    AudioSourceResult, CatalogSearchProvider, EntryStub, LinkResolution, MediaResolverProvider,
};
use aquapod::music::error::{ChannelError, ResolutionError, SinkError};
use aquapod::music::sink::{ControlButton, MessageChannel, VoiceSink};
use aquapod::music::track::{ChannelKey, GuildKey, MessageKey, PlaybackId, Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Connect(GuildKey, ChannelKey),
    Play(GuildKey, String, PlaybackId),
    Pause(GuildKey),
    Resume(GuildKey),
    Stop(GuildKey),
    Disconnect(GuildKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Playing,
    Paused,
}

/// Records every call and keeps a play/pause state per guild.
#[derive(Default)]
pub struct FakeSink {
    calls: Mutex<Vec<SinkCall>>,
    modes: Mutex<HashMap<GuildKey, Mode>>,
    unplayable: Mutex<HashSet<String>>,
    join_gate: Mutex<Option<std::sync::Arc<Notify>>>,
}

impl FakeSink {
    /// Hold every `connect` until the gate is notified.
    pub fn hold_joins(&self, gate: std::sync::Arc<Notify>) {
        *self.join_gate.lock().unwrap() = Some(gate);
    }

    /// Make `play` fail for the track with this title.
    pub fn refuse(&self, title: &str) {
        self.unplayable.lock().unwrap().insert(title.to_string());
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Play(_, title, _) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    /// Playback id handed out for the most recent `play` of `title`.
    pub fn playback_of(&self, title: &str) -> Option<PlaybackId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                SinkCall::Play(_, t, id) if t == title => Some(*id),
                _ => None,
            })
    }

    fn record(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VoiceSink for FakeSink {
    async fn connect(&self, guild: GuildKey, channel: ChannelKey) -> Result<(), SinkError> {
        self.record(SinkCall::Connect(guild, channel));
        let gate = self.join_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn play(&self, guild: GuildKey, track: &Track, playback: PlaybackId) -> Result<(), SinkError> {
        self.record(SinkCall::Play(guild, track.title.clone(), playback));
        if self.unplayable.lock().unwrap().contains(&track.title) {
            return Err(SinkError::Stream(format!("cannot open {}", track.stream_ref)));
        }
        self.modes.lock().unwrap().insert(guild, Mode::Playing);
        Ok(())
    }

    async fn pause(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.record(SinkCall::Pause(guild));
        self.modes.lock().unwrap().insert(guild, Mode::Paused);
        Ok(())
    }

    async fn resume(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.record(SinkCall::Resume(guild));
        self.modes.lock().unwrap().insert(guild, Mode::Playing);
        Ok(())
    }

    async fn stop(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.record(SinkCall::Stop(guild));
        self.modes.lock().unwrap().remove(&guild);
        Ok(())
    }

    async fn disconnect(&self, guild: GuildKey) -> Result<(), SinkError> {
        self.record(SinkCall::Disconnect(guild));
        self.modes.lock().unwrap().remove(&guild);
        Ok(())
    }

    async fn is_playing(&self, guild: GuildKey) -> bool {
        self.modes.lock().unwrap().get(&guild) == Some(&Mode::Playing)
    }

    async fn is_paused(&self, guild: GuildKey) -> bool {
        self.modes.lock().unwrap().get(&guild) == Some(&Mode::Paused)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: ChannelKey,
    pub content: String,
    pub controls: Vec<ControlButton>,
}

/// Keeps the messages that currently exist, like a real channel would.
#[derive(Default)]
pub struct RecordingChannel {
    next_id: AtomicU64,
    live: Mutex<BTreeMap<MessageKey, PostedMessage>>,
    sent: Mutex<Vec<PostedMessage>>,
}

impl RecordingChannel {
    /// Messages that have been sent and not deleted.
    pub fn live(&self) -> Vec<PostedMessage> {
        self.live.lock().unwrap().values().cloned().collect()
    }

    /// Messages sent without controls (notices, not status messages).
    pub fn notices(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.controls.is_empty())
            .map(|m| m.content.clone())
            .collect()
    }

    /// The most recent content of the status message, if any.
    pub fn status(&self) -> Option<String> {
        self.live
            .lock()
            .unwrap()
            .values()
            .rev()
            .find(|m| !m.controls.is_empty())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send(
        &self,
        channel: ChannelKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<MessageKey, ChannelError> {
        let id = MessageKey(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let message = PostedMessage {
            channel,
            content: content.to_string(),
            controls: controls.to_vec(),
        };
        self.sent.lock().unwrap().push(message.clone());
        self.live.lock().unwrap().insert(id, message);
        Ok(id)
    }

    async fn edit(
        &self,
        channel: ChannelKey,
        message: MessageKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<(), ChannelError> {
        let mut live = self.live.lock().unwrap();
        match live.get_mut(&message) {
            Some(existing) if existing.channel == channel => {
                existing.content = content.to_string();
                existing.controls = controls.to_vec();
                Ok(())
            }
            _ => Err(ChannelError::Edit(format!("unknown message {:?}", message))),
        }
    }

    async fn delete(&self, _channel: ChannelKey, message: MessageKey) -> Result<(), ChannelError> {
        self.live
            .lock()
            .unwrap()
            .remove(&message)
            .map(|_| ())
            .ok_or_else(|| ChannelError::Delete(format!("unknown message {:?}", message)))
    }
}

/// Serves canned link resolutions. Entry URLs missing from `entries` fail.
#[derive(Default)]
pub struct StaticProvider {
    links: HashMap<String, LinkResolution>,
    entries: HashMap<String, Track>,
    gate: Option<std::sync::Arc<Notify>>,
}

impl StaticProvider {
    pub fn with_track(mut self, url: &str, track: Track) -> Self {
        self.links.insert(url.to_string(), LinkResolution::Single(track));
        self
    }

    pub fn with_playlist(mut self, url: &str, title: &str, entries: Vec<(&str, Option<Track>)>) -> Self {
        let stubs = entries
            .iter()
            .enumerate()
            .map(|(i, (entry_url, _))| EntryStub {
                index: i + 1,
                url: entry_url.to_string(),
                title: None,
            })
            .collect();
        for (entry_url, track) in entries {
            if let Some(track) = track {
                self.entries.insert(entry_url.to_string(), track);
            }
        }
        self.links.insert(
            url.to_string(),
            LinkResolution::Playlist {
                title: Some(title.to_string()),
                entries: stubs,
            },
        );
        self
    }

    /// Hold every link resolution until the gate is notified.
    pub fn gated(mut self, gate: std::sync::Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl MediaResolverProvider for StaticProvider {
    async fn resolve_link(&self, url: &str) -> AudioSourceResult<LinkResolution> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.links
            .get(url)
            .cloned()
            .ok_or_else(|| ResolutionError::NoStream(url.to_string()))
    }

    async fn resolve_entry(&self, entry: &EntryStub) -> AudioSourceResult<Track> {
        self.entries
            .get(&entry.url)
            .cloned()
            .ok_or_else(|| ResolutionError::NoStream(entry.url.clone()))
    }
}

/// Answers every search with the same track.
pub struct FixedSearch(pub Track);

#[async_trait]
impl CatalogSearchProvider for FixedSearch {
    async fn search(&self, _text: &str) -> AudioSourceResult<Option<Track>> {
        Ok(Some(self.0.clone()))
    }
}
