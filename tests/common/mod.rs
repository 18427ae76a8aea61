//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories
#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use aquapod::music::audio_sources::{
    CatalogSearchProvider, MediaResolverProvider, ResolverSettings, TrackResolver,
};
use aquapod::music::event_handlers;
use aquapod::music::queue_manager::{GuildPlaybackState, GuildQueueStore};
use aquapod::music::track::{ChannelKey, GuildKey};
use aquapod::music::{ControllerHandle, PlaybackController};

use mocks::{FakeSink, RecordingChannel};

/// A running controller wired to in-memory collaborators.
pub struct Harness {
    pub handle: ControllerHandle,
    pub sink: Arc<FakeSink>,
    pub channel: Arc<RecordingChannel>,
    task: JoinHandle<()>,
}

pub fn settings() -> ResolverSettings {
    ResolverSettings {
        attempts: 1,
        attempt_timeout: Duration::from_secs(5),
        retry_delay: Duration::from_millis(1),
        workers: 2,
        max_playlist_entries: 50,
    }
}

impl Harness {
    pub fn start(
        provider: impl MediaResolverProvider + 'static,
        search: Option<Arc<dyn CatalogSearchProvider>>,
        status: Option<ChannelKey>,
    ) -> Self {
        let sink = Arc::new(FakeSink::default());
        let channel = Arc::new(RecordingChannel::default());
        let resolver = TrackResolver::new(Arc::new(provider), search, settings());

        let (handle, events) = event_handlers::channel();
        let controller = PlaybackController::new(
            GuildQueueStore::with_default_channel(status),
            sink.clone(),
            channel.clone(),
            Arc::new(resolver),
            handle.clone(),
        );
        let task = tokio::spawn(controller.run(events));

        Self {
            handle,
            sink,
            channel,
            task,
        }
    }

    pub async fn state(&self, guild: GuildKey) -> GuildPlaybackState {
        self.handle
            .state(guild)
            .await
            .expect("controller running")
            .unwrap_or_default()
    }

    pub async fn current_title(&self, guild: GuildKey) -> Option<String> {
        self.state(guild).await.current_track.map(|t| t.title)
    }

    pub async fn queued_titles(&self, guild: GuildKey) -> Vec<String> {
        self.state(guild)
            .await
            .pending_queue
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    pub async fn shutdown(self) {
        self.handle.shutdown();
        self.task.await.expect("controller task");
    }
}
