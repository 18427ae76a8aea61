//! The playback state machine.
//!
//! A guild is IDLE when it has no current track, otherwise PLAYING or PAUSED
//! as reported by the voice sink. All transitions run on the controller's
//! single event loop (see [`super::event_handlers`]); the only work done
//! elsewhere is joining voice and resolving tracks, whose results come back
//! as events.

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::audio_sources::{AudioSourceResult, ResolvedSet, TrackResolver};
use super::embedded_messages as messages;
use super::error::{MusicError, MusicResult};
use super::event_handlers::{Command, ControllerEvent, ControllerHandle, EventReceiver};
use super::queue_manager::{GuildPlaybackState, GuildQueueStore};
use super::sink::{MessageChannel, VoiceSink};
use super::track::{ChannelKey, GuildKey, PlaybackId, Track};

/// Lines reported back to whoever issued a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notice {
    pub lines: Vec<String>,
}

impl Notice {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub type Reply = oneshot::Sender<MusicResult<Notice>>;

/// What happened while moving to the next track.
#[derive(Debug, Default)]
struct Advanced {
    failures: Vec<String>,
    started: Option<String>,
    status: Option<String>,
}

impl Advanced {
    fn into_lines(self) -> Vec<String> {
        self.failures
            .into_iter()
            .chain(self.started)
            .chain(self.status)
            .collect()
    }
}

/// Owns every guild's playback state and drives the sink from it.
pub struct PlaybackController {
    store: GuildQueueStore,
    sink: Arc<dyn VoiceSink>,
    channel: Arc<dyn MessageChannel>,
    resolver: Arc<TrackResolver>,
    handle: ControllerHandle,
    next_playback: u64,
}

impl PlaybackController {
    pub fn new(
        store: GuildQueueStore,
        sink: Arc<dyn VoiceSink>,
        channel: Arc<dyn MessageChannel>,
        resolver: Arc<TrackResolver>,
        handle: ControllerHandle,
    ) -> Self {
        Self {
            store,
            sink,
            channel,
            resolver,
            handle,
            next_playback: 0,
        }
    }

    /// Read-only view of a guild's state.
    pub fn state(&self, guild: GuildKey) -> Option<&GuildPlaybackState> {
        self.store.get(guild)
    }

    /// Consume events until every handle is dropped or a shutdown arrives.
    pub async fn run(mut self, mut events: EventReceiver) {
        info!("Playback controller started");
        while let Some(event) = events.recv().await {
            if matches!(event, ControllerEvent::Shutdown) {
                break;
            }
            self.handle(event).await;
        }
        info!("Playback controller stopped");
    }

    /// Apply one event. Never runs concurrently with another event.
    pub async fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Command {
                guild,
                command,
                reply,
            } => self.handle_command(guild, command, reply).await,
            ControllerEvent::Resolved {
                guild,
                session,
                result,
                reply,
            } => {
                let outcome = self.enqueue_resolved(guild, session, result).await;
                let _ = reply.send(outcome);
            }
            ControllerEvent::Inspect { guild, reply } => {
                let _ = reply.send(self.store.get(guild).cloned());
            }
            ControllerEvent::TrackFinished { guild, playback } => {
                self.on_track_finished(guild, playback).await
            }
            ControllerEvent::PlaybackFailed {
                guild,
                playback,
                reason,
            } => self.on_playback_failed(guild, playback, &reason).await,
            ControllerEvent::Shutdown => {}
        }
    }

    async fn handle_command(&mut self, guild: GuildKey, command: Command, reply: Reply) {
        debug!(%guild, ?command, "Handling command");
        let outcome = match command {
            Command::Play {
                voice_channel,
                query,
            } => {
                // Replies once resolution finishes, from the `Resolved` event.
                self.begin_play(guild, voice_channel, query, reply);
                return;
            }
            Command::Pause => self.pause(guild).await,
            Command::Resume => self.resume(guild).await,
            Command::Skip => self.skip(guild).await,
            Command::Stop => self.stop(guild).await,
            Command::ClearQueue => self.clear_queue(guild).await,
            Command::Refresh => self.refresh(guild).await,
            Command::SetChannel(channel) => self.set_channel(guild, channel).await,
        };
        let _ = reply.send(outcome);
    }

    /// Validate the query, then join the caller's voice channel and resolve
    /// in a background task. The loop never waits on either.
    pub fn begin_play(
        &mut self,
        guild: GuildKey,
        voice_channel: ChannelKey,
        query: String,
        reply: Reply,
    ) {
        if let Err(err) = self.resolver.classify(&query) {
            let _ = reply.send(Err(err.into()));
            return;
        }

        let session = self.store.session(guild);
        let sink = Arc::clone(&self.sink);
        let resolver = Arc::clone(&self.resolver);
        let handle = self.handle.clone();

        tokio::spawn(async move {
            if let Err(err) = sink.connect(guild, voice_channel).await {
                error!(%guild, "Failed to join voice channel {}: {}", voice_channel, err);
                let _ = reply.send(Err(err.into()));
                return;
            }

            info!(%guild, "Resolving query: {}", query);
            let result = resolver.resolve(&query).await;
            handle.resolved(guild, session, result, reply);
        });
    }

    /// Put resolved tracks into the guild's queue, starting playback if idle.
    ///
    /// Results stamped with an older session arrived after a stop or clear
    /// and are dropped.
    pub async fn enqueue_resolved(
        &mut self,
        guild: GuildKey,
        session: u64,
        result: AudioSourceResult<ResolvedSet>,
    ) -> MusicResult<Notice> {
        let resolved = result.map_err(|err| {
            warn!(%guild, "Resolution failed: {}", err);
            MusicError::from(err)
        })?;

        if self.store.session(guild) != session {
            info!(%guild, "Discarding tracks resolved after the queue was stopped");
            return Ok(Notice::new(messages::STOPPED_WHILE_RESOLVING));
        }

        let (playlist, tracks) = match resolved {
            ResolvedSet::Single(track) => (None, vec![track]),
            ResolvedSet::Playlist {
                title,
                tracks,
                skipped,
            } => (Some((title, skipped)), tracks),
        };
        let count = tracks.len();

        let mut notice = Notice::default();
        let idle = self.store.get_or_create(guild).is_idle();
        let mut tracks = tracks.into_iter();

        if idle {
            let first = tracks.next();
            for track in tracks {
                self.store.enqueue(guild, track);
            }
            notice.extend(self.play_from(guild, first).await.into_lines());
        } else {
            let mut last = None;
            for track in tracks {
                let position = self.store.enqueue(guild, track.clone());
                info!(%guild, "Added to queue: {} (position {})", track.title, position);
                last = Some((track, position));
            }
            if let (None, Some((track, position))) = (&playlist, &last) {
                notice.push(messages::added_to_queue(track, *position));
            }
            notice.extend(self.sync_status(guild).await);
        }

        if let Some((title, skipped)) = playlist {
            notice.lines.insert(0, messages::playlist_added(title.as_deref(), count, skipped));
        }

        Ok(notice)
    }

    /// Pause if the sink is actively playing.
    pub async fn pause(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        if !self.sink.is_playing(guild).await {
            return Ok(Notice::new(messages::NOTHING_PLAYING));
        }
        self.sink.pause(guild).await?;
        info!(%guild, "Track paused");
        Ok(Notice::new(messages::PAUSED))
    }

    /// Resume if the sink is paused.
    pub async fn resume(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        if !self.sink.is_paused(guild).await {
            return Ok(Notice::new(messages::NOTHING_PAUSED));
        }
        self.sink.resume(guild).await?;
        info!(%guild, "Track resumed");
        Ok(Notice::new(messages::RESUMED))
    }

    /// Force-stop the current track and advance.
    pub async fn skip(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        let has_current = self
            .store
            .get(guild)
            .is_some_and(|state| !state.is_idle());
        let active = has_current
            || self.sink.is_playing(guild).await
            || self.sink.is_paused(guild).await;
        if !active {
            return Ok(Notice::new(messages::NOTHING_PLAYING));
        }

        if let Err(err) = self.sink.stop(guild).await {
            warn!(%guild, "Failed to stop track while skipping: {}", err);
        }
        info!(%guild, "Track skipped");

        let mut notice = Notice::new(messages::SKIPPED);
        notice.extend(self.advance(guild).await.into_lines());
        Ok(notice)
    }

    /// Stop playback, leave the voice channel and wipe the queue.
    pub async fn stop(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        if let Err(err) = self.sink.stop(guild).await {
            warn!(%guild, "Failed to stop track: {}", err);
        }
        if let Err(err) = self.sink.disconnect(guild).await {
            // The main goal (stopping) is achieved either way.
            warn!(%guild, "Failed to leave voice channel during stop: {}", err);
        }
        self.store.clear(guild);
        info!(%guild, "Playback stopped and queue cleared");

        let mut notice = Notice::new(messages::STOPPED);
        notice.extend(self.sync_status(guild).await);
        Ok(notice)
    }

    /// Drop every pending track but keep the current one playing.
    pub async fn clear_queue(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        self.store.clear_pending(guild);
        info!(%guild, "Queue cleared");

        let mut notice = Notice::new(messages::CLEARED);
        notice.extend(self.sync_status(guild).await);
        Ok(notice)
    }

    /// Delete and recreate the status message.
    pub async fn refresh(&mut self, guild: GuildKey) -> MusicResult<Notice> {
        let state = self.store.get_or_create(guild);
        match messages::refresh(state, self.channel.as_ref()).await {
            Ok(_) => {
                info!(%guild, "Queue message refreshed");
                Ok(Notice::new(messages::REFRESHED))
            }
            Err(MusicError::ChannelNotConfigured) => {
                Ok(Notice::new(MusicError::ChannelNotConfigured.user_message()))
            }
            Err(err) => Err(err),
        }
    }

    /// Move the status message to `channel`.
    pub async fn set_channel(&mut self, guild: GuildKey, channel: ChannelKey) -> MusicResult<Notice> {
        let state = self.store.get_or_create(guild);
        let mut notice = Notice::new(messages::channel_set(channel));
        if let Err(err) = messages::reassign(state, channel, self.channel.as_ref()).await {
            warn!(%guild, "Failed to post status message in {}: {}", channel, err);
            notice.push(err.user_message());
        }
        info!(%guild, "Bot channel set to {}", channel);
        Ok(notice)
    }

    /// The sink finished a playback on its own.
    ///
    /// A live stream that drops looks exactly like a finished track and takes
    /// the same path.
    pub async fn on_track_finished(&mut self, guild: GuildKey, playback: PlaybackId) {
        if !self.is_current_playback(guild, playback) {
            debug!(%guild, %playback, "Ignoring end of a playback that is no longer current");
            return;
        }
        info!(%guild, %playback, "Track ended");
        self.advance_in_background(guild).await;
    }

    /// The sink could not keep a playback going.
    pub async fn on_playback_failed(&mut self, guild: GuildKey, playback: PlaybackId, reason: &str) {
        if !self.is_current_playback(guild, playback) {
            debug!(%guild, %playback, "Ignoring failure of a playback that is no longer current");
            return;
        }

        if let Some(track) = self
            .store
            .get(guild)
            .and_then(|state| state.current_track.as_ref())
        {
            warn!(%guild, "Failed to play {}: {}", track.title, reason);
            let line = messages::failed_to_play(track);
            self.announce(guild, vec![line]).await;
        }
        self.advance_in_background(guild).await;
    }

    /// Advance outside any command: failures are announced before the
    /// status message shows the new state.
    async fn advance_in_background(&mut self, guild: GuildKey) {
        let advanced = self.start_from(guild, None).await;
        self.announce(guild, advanced.failures).await;
        self.sync_status(guild).await;
    }

    fn is_current_playback(&self, guild: GuildKey, playback: PlaybackId) -> bool {
        self.store
            .get(guild)
            .is_some_and(|state| state.playback == Some(playback))
    }

    /// Play the queue head, or go idle if the queue is empty.
    async fn advance(&mut self, guild: GuildKey) -> Advanced {
        self.play_from(guild, None).await
    }

    /// Start `first` (or the queue head), then re-render the status message.
    async fn play_from(&mut self, guild: GuildKey, first: Option<Track>) -> Advanced {
        let mut advanced = self.start_from(guild, first).await;
        advanced.status = self.sync_status(guild).await;
        advanced
    }

    /// Start `first` (or the queue head), skipping past anything the sink
    /// cannot play. Leaves the guild idle when nothing is left.
    async fn start_from(&mut self, guild: GuildKey, first: Option<Track>) -> Advanced {
        let mut advanced = Advanced::default();
        let mut candidate = first.or_else(|| self.store.pop_next(guild));

        loop {
            let Some(track) = candidate else {
                info!(%guild, "No more tracks in queue");
                self.store.set_current(guild, None);
                break;
            };

            match self.start(guild, track).await {
                Ok(line) => {
                    advanced.started = Some(line);
                    break;
                }
                Err(line) => {
                    advanced.failures.push(line);
                    candidate = self.store.pop_next(guild);
                }
            }
        }

        advanced
    }

    async fn start(&mut self, guild: GuildKey, track: Track) -> Result<String, String> {
        self.next_playback += 1;
        let playback = PlaybackId(self.next_playback);

        self.store.set_current(guild, Some(track.clone()));
        self.store.get_or_create(guild).playback = Some(playback);

        match self.sink.play(guild, &track, playback).await {
            Ok(()) => {
                info!(%guild, %playback, "Now playing: {}", track.title);
                Ok(messages::now_playing(&track))
            }
            Err(err) => {
                warn!(%guild, "Failed to play {}: {}", track.title, err);
                self.store.set_current(guild, None);
                Err(messages::failed_to_play(&track))
            }
        }
    }

    /// Re-render the status message. Returns a line for the user when no
    /// channel is configured; other failures are only logged.
    async fn sync_status(&mut self, guild: GuildKey) -> Option<String> {
        let state = self.store.get_or_create(guild);
        match messages::sync(state, self.channel.as_ref()).await {
            Ok(_) => None,
            Err(MusicError::ChannelNotConfigured) => {
                debug!(%guild, "No status channel configured");
                Some(MusicError::ChannelNotConfigured.user_message())
            }
            Err(err) => {
                warn!(%guild, "Error updating status message: {}", err);
                None
            }
        }
    }

    /// Post failures noticed outside any command to the status channel.
    async fn announce(&self, guild: GuildKey, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        let Some(channel) = self.store.get(guild).and_then(|s| s.status_channel) else {
            return;
        };
        if let Err(err) = self.channel.send(channel, &lines.join("\n"), &[]).await {
            warn!(%guild, "Failed to announce playback failure: {}", err);
        }
    }
}
