//! Turns a user query into playable tracks.
//!
//! Links matching a known media pattern go to the [`MediaResolverProvider`];
//! free text goes to the optional [`CatalogSearchProvider`]. Playlists are
//! expanded in two passes: the provider lists entry stubs cheaply, then each
//! stub is resolved on its own through a bounded worker pool, with a
//! per-attempt timeout and a fixed number of attempts. Entries that still
//! fail are skipped.

/// Submodule implementing the podcast catalog search against Spotify.
#[cfg(feature = "podcast_search")]
pub mod spotify;
/// Submodule implementing the providers on top of the `yt-dlp` binary.
pub mod youtube;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use regex::Regex;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::error::ResolutionError;
use super::track::Track;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, ResolutionError>;

static YOUTUBE_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?|shorts/|live/|playlist\?|embed/)|youtu\.be/)\S+$",
    )
    .expect("static regex")
});

static SOUNDCLOUD_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:(?:www|m)\.)?soundcloud\.com/[\w\-]+/[\w\-]+\S*$")
        .expect("static regex")
});

/// One entry of a playlist, listed but not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStub {
    /// Position inside the playlist, starting at 1.
    pub index: usize,
    pub url: String,
    pub title: Option<String>,
}

/// What a provider returns for a link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkResolution {
    Single(Track),
    Playlist {
        title: Option<String>,
        entries: Vec<EntryStub>,
    },
}

/// What the resolver hands to the playback controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSet {
    Single(Track),
    Playlist {
        title: Option<String>,
        tracks: Vec<Track>,
        skipped: usize,
    },
}

impl ResolvedSet {
    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            ResolvedSet::Single(track) => vec![track],
            ResolvedSet::Playlist { tracks, .. } => tracks,
        }
    }
}

/// Resolves recognized media links and playlist entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolverProvider: Send + Sync {
    async fn resolve_link(&self, url: &str) -> AudioSourceResult<LinkResolution>;

    async fn resolve_entry(&self, entry: &EntryStub) -> AudioSourceResult<Track>;
}

/// Finds the best match for free text. Absent in link-only deployments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSearchProvider: Send + Sync {
    async fn search(&self, text: &str) -> AudioSourceResult<Option<Track>>;
}

/// How a query will be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Link(String),
    Search(String),
}

/// Retry, timeout and pool sizing for the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Attempts per resolution, including the first one.
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
    pub workers: usize,
    pub max_playlist_entries: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_millis(500),
            workers: 4,
            max_playlist_entries: 100,
        }
    }
}

impl ResolutionError {
    fn is_transient(&self) -> bool {
        matches!(self, ResolutionError::Provider(_) | ResolutionError::Timeout(_))
    }
}

/// Utility helpers shared by providers.
pub struct AudioSource;

impl AudioSource {
    /// Whether the input parses as an http(s) URL.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }

    /// Whether the input is a media link some provider knows how to open.
    pub fn is_supported_link(input: &str) -> bool {
        YOUTUBE_LINK_REGEX.is_match(input) || SOUNDCLOUD_LINK_REGEX.is_match(input)
    }

    /// Whether the link names a whole playlist rather than a single video.
    pub fn is_playlist_link(input: &str) -> bool {
        Url::parse(&Self::with_scheme(input)).is_ok_and(|url| {
            url.path() == "/playlist" || url.path().contains("/sets/")
        })
    }

    fn with_scheme(input: &str) -> String {
        if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        }
    }
}

/// Turns user queries into [`ResolvedSet`]s.
pub struct TrackResolver {
    links: Arc<dyn MediaResolverProvider>,
    search: Option<Arc<dyn CatalogSearchProvider>>,
    settings: ResolverSettings,
    pool: Arc<Semaphore>,
}

impl TrackResolver {
    pub fn new(
        links: Arc<dyn MediaResolverProvider>,
        search: Option<Arc<dyn CatalogSearchProvider>>,
        settings: ResolverSettings,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(settings.workers.max(1)));
        Self {
            links,
            search,
            settings,
            pool,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Decide how a query should be resolved without touching any provider.
    pub fn classify(&self, query: &str) -> AudioSourceResult<QueryKind> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::InvalidQuery(query.to_string()));
        }

        if AudioSource::is_supported_link(query) {
            return Ok(QueryKind::Link(AudioSource::with_scheme(query)));
        }

        if AudioSource::is_url(query) || self.search.is_none() {
            return Err(ResolutionError::InvalidQuery(query.to_string()));
        }

        Ok(QueryKind::Search(query.to_string()))
    }

    /// Resolve a query into one track or an expanded playlist.
    pub async fn resolve(&self, query: &str) -> AudioSourceResult<ResolvedSet> {
        match self.classify(query)? {
            QueryKind::Link(url) => {
                info!("Resolving link: {}", url);
                let resolution = self
                    .with_retry(&url, || self.links.resolve_link(&url))
                    .await?;

                match resolution {
                    LinkResolution::Single(track) => Ok(ResolvedSet::Single(track)),
                    LinkResolution::Playlist { title, entries } => {
                        self.expand_playlist(title, entries).await
                    }
                }
            }
            QueryKind::Search(text) => {
                info!("Searching for: {}", text);
                let Some(search) = self.search.as_ref() else {
                    return Err(ResolutionError::InvalidQuery(text));
                };
                let hit = self.with_retry(&text, || search.search(&text)).await?;
                hit.map(ResolvedSet::Single)
                    .ok_or(ResolutionError::NoStream(text))
            }
        }
    }

    async fn expand_playlist(
        &self,
        title: Option<String>,
        mut entries: Vec<EntryStub>,
    ) -> AudioSourceResult<ResolvedSet> {
        if entries.len() > self.settings.max_playlist_entries {
            info!(
                "Playlist has {} entries, keeping the first {}",
                entries.len(),
                self.settings.max_playlist_entries
            );
            entries.truncate(self.settings.max_playlist_entries);
        }
        debug!("Expanding playlist {:?} with {} entries", title, entries.len());

        // `buffered` keeps playlist order while the pool resolves entries concurrently.
        let results: Vec<(EntryStub, AudioSourceResult<Track>)> = stream::iter(entries)
            .map(|entry| async move {
                let result = self
                    .with_retry(&entry.url, || self.links.resolve_entry(&entry))
                    .await;
                (entry, result)
            })
            .buffered(self.settings.workers.max(1))
            .collect()
            .await;

        let mut tracks = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for (entry, result) in results {
            match result {
                Ok(track) => tracks.push(track),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        "Skipping playlist entry {} ({}): {}",
                        entry.index,
                        entry.title.as_deref().unwrap_or(&entry.url),
                        err
                    );
                }
            }
        }

        if tracks.is_empty() {
            return Err(ResolutionError::EmptyPlaylist);
        }

        Ok(ResolvedSet::Playlist {
            title,
            tracks,
            skipped,
        })
    }

    /// Run one provider call under the pool, with a timeout per attempt and
    /// a fixed number of attempts for transient failures.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> AudioSourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AudioSourceResult<T>>,
    {
        let attempts = self.settings.attempts.max(1);
        let mut last_error = ResolutionError::Provider(format!("no attempt made for {}", what));

        for attempt in 1..=attempts {
            let outcome = {
                let _permit = self
                    .pool
                    .acquire()
                    .await
                    .map_err(|_| ResolutionError::Provider("resolver pool closed".to_string()))?;
                tokio::time::timeout(self.settings.attempt_timeout, call()).await
            };

            match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if !err.is_transient() => return Err(err),
                Ok(Err(err)) => {
                    warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, what, err);
                    last_error = err;
                }
                Err(_) => {
                    warn!("Attempt {}/{} for {} timed out", attempt, attempts, what);
                    last_error = ResolutionError::Timeout(self.settings.attempt_timeout);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockall::predicate::eq;
    use test_case::test_case;

    fn track(title: &str, url: &str) -> Track {
        Track::new(Some(title), url, false, url).unwrap()
    }

    fn stub(index: usize) -> EntryStub {
        EntryStub {
            index,
            url: format!("https://www.youtube.com/watch?v=entry{}", index),
            title: Some(format!("Entry {}", index)),
        }
    }

    fn resolver(
        links: MockMediaResolverProvider,
        search: Option<MockCatalogSearchProvider>,
    ) -> TrackResolver {
        TrackResolver::new(
            Arc::new(links),
            search.map(|s| Arc::new(s) as Arc<dyn CatalogSearchProvider>),
            ResolverSettings {
                attempts: 3,
                attempt_timeout: Duration::from_secs(5),
                retry_delay: Duration::from_millis(10),
                workers: 2,
                max_playlist_entries: 10,
            },
        )
    }

    #[test_case("https://www.youtube.com/watch?v=dQw4w9WgXcQ" ; "watch")]
    #[test_case("https://youtu.be/dQw4w9WgXcQ" ; "short link")]
    #[test_case("https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=10" ; "mobile")]
    #[test_case("https://www.youtube.com/shorts/abc123" ; "shorts")]
    #[test_case("https://www.youtube.com/live/abc123" ; "live")]
    #[test_case("https://music.youtube.com/watch?v=abc123" ; "music")]
    #[test_case("https://www.youtube.com/playlist?list=PL123" ; "playlist")]
    #[test_case("https://soundcloud.com/artist/some-track" ; "soundcloud")]
    #[test_case("youtube.com/watch?v=abc123" ; "no scheme")]
    fn recognizes_media_links(link: &str) {
        assert!(AudioSource::is_supported_link(link));
    }

    #[test_case("https://example.com/video.mp4" ; "other site")]
    #[test_case("https://www.youtube.com/@channel" ; "channel page")]
    #[test_case("lofi hip hop" ; "plain text")]
    fn rejects_other_inputs(input: &str) {
        assert!(!AudioSource::is_supported_link(input));
    }

    #[test_case("https://www.youtube.com/playlist?list=PL123" => true)]
    #[test_case("https://www.youtube.com/watch?v=abc&list=PL123" => false)]
    #[test_case("https://soundcloud.com/artist/sets/mix" => true)]
    #[test_case("https://youtu.be/abc" => false)]
    fn playlist_links(link: &str) -> bool {
        AudioSource::is_playlist_link(link)
    }

    #[test]
    fn classify_without_search_provider() {
        let resolver = resolver(MockMediaResolverProvider::new(), None);

        pretty_assertions::assert_eq!(
            resolver.classify("  youtu.be/abc ").unwrap(),
            QueryKind::Link("https://youtu.be/abc".to_string())
        );
        assert_matches!(
            resolver.classify("some podcast"),
            Err(ResolutionError::InvalidQuery(_))
        );
        assert_matches!(
            resolver.classify("https://example.com/a.mp3"),
            Err(ResolutionError::InvalidQuery(_))
        );
        assert_matches!(resolver.classify("   "), Err(ResolutionError::InvalidQuery(_)));
    }

    #[test]
    fn classify_with_search_provider() {
        let resolver = resolver(
            MockMediaResolverProvider::new(),
            Some(MockCatalogSearchProvider::new()),
        );

        pretty_assertions::assert_eq!(
            resolver.classify("Podcast: episode 3").unwrap(),
            QueryKind::Search("Podcast: episode 3".to_string())
        );
        // Unknown links never fall through to search.
        assert_matches!(
            resolver.classify("https://example.com/a.mp3"),
            Err(ResolutionError::InvalidQuery(_))
        );
    }

    #[tokio::test]
    async fn resolves_single_link() {
        let mut links = MockMediaResolverProvider::new();
        links
            .expect_resolve_link()
            .with(eq("https://youtu.be/video123"))
            .times(1)
            .returning(|url| Ok(LinkResolution::Single(track("Song A", url))));

        let resolved = resolver(links, None)
            .resolve("https://youtu.be/video123")
            .await
            .unwrap();

        pretty_assertions::assert_eq!(resolved, ResolvedSet::Single(track("Song A", "https://youtu.be/video123")));
    }

    #[tokio::test]
    async fn search_takes_top_hit() {
        let mut search = MockCatalogSearchProvider::new();
        search
            .expect_search()
            .with(eq("daily news"))
            .times(1)
            .returning(|_| Ok(Some(track("Daily News Ep. 1", "https://youtu.be/ep1"))));

        let resolved = resolver(MockMediaResolverProvider::new(), Some(search))
            .resolve("daily news")
            .await
            .unwrap();

        assert_matches!(resolved, ResolvedSet::Single(t) if t.title == "Daily News Ep. 1");
    }

    #[tokio::test]
    async fn search_without_hit_is_no_stream() {
        let mut search = MockCatalogSearchProvider::new();
        search.expect_search().returning(|_| Ok(None));

        let err = resolver(MockMediaResolverProvider::new(), Some(search))
            .resolve("nothing matches")
            .await
            .unwrap_err();

        pretty_assertions::assert_eq!(err, ResolutionError::NoStream("nothing matches".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn playlist_skips_failed_entries() {
        let mut links = MockMediaResolverProvider::new();
        links.expect_resolve_link().returning(|_| {
            Ok(LinkResolution::Playlist {
                title: Some("Mix".to_string()),
                entries: vec![stub(1), stub(2), stub(3)],
            })
        });
        links.expect_resolve_entry().returning(|entry| {
            if entry.index == 2 {
                Err(ResolutionError::Provider("video unavailable".to_string()))
            } else {
                Ok(track(entry.title.as_deref().unwrap(), &entry.url))
            }
        });

        let resolved = resolver(links, None)
            .resolve("https://www.youtube.com/playlist?list=PL123")
            .await
            .unwrap();

        assert_matches!(resolved, ResolvedSet::Playlist { ref tracks, skipped: 1, .. } => {
            let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
            pretty_assertions::assert_eq!(titles, vec!["Entry 1", "Entry 3"]);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let mut links = MockMediaResolverProvider::new();
        let mut seq = mockall::Sequence::new();
        links
            .expect_resolve_link()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(ResolutionError::Provider("HTTP 503".to_string())));
        links
            .expect_resolve_link()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url| Ok(LinkResolution::Single(track("Song A", url))));

        let resolved = resolver(links, None).resolve("https://youtu.be/abc").await;

        assert_matches!(resolved, Ok(ResolvedSet::Single(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_bounded_attempts() {
        let mut links = MockMediaResolverProvider::new();
        links
            .expect_resolve_link()
            .times(3)
            .returning(|_| Err(ResolutionError::Provider("HTTP 503".to_string())));

        let err = resolver(links, None)
            .resolve("https://youtu.be/abc")
            .await
            .unwrap_err();

        pretty_assertions::assert_eq!(err, ResolutionError::Provider("HTTP 503".to_string()));
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let mut links = MockMediaResolverProvider::new();
        links
            .expect_resolve_link()
            .times(1)
            .returning(|url| Err(ResolutionError::NoStream(url.to_string())));

        let err = resolver(links, None)
            .resolve("https://youtu.be/abc")
            .await
            .unwrap_err();

        assert_matches!(err, ResolutionError::NoStream(_));
    }

    #[tokio::test(start_paused = true)]
    async fn playlist_with_no_playable_entries_fails() {
        let mut links = MockMediaResolverProvider::new();
        links.expect_resolve_link().returning(|_| {
            Ok(LinkResolution::Playlist {
                title: None,
                entries: vec![stub(1), stub(2)],
            })
        });
        links
            .expect_resolve_entry()
            .returning(|entry| Err(ResolutionError::NoStream(entry.url.clone())));

        let err = resolver(links, None)
            .resolve("https://www.youtube.com/playlist?list=PL123")
            .await
            .unwrap_err();

        pretty_assertions::assert_eq!(err, ResolutionError::EmptyPlaylist);
    }

    #[tokio::test]
    async fn playlist_is_capped() {
        let mut links = MockMediaResolverProvider::new();
        links.expect_resolve_link().returning(|_| {
            Ok(LinkResolution::Playlist {
                title: None,
                entries: (1..=25).map(stub).collect(),
            })
        });
        links
            .expect_resolve_entry()
            .times(10)
            .returning(|entry| Ok(track("entry", &entry.url)));

        let resolved = resolver(links, None)
            .resolve("https://www.youtube.com/playlist?list=PL123")
            .await
            .unwrap();

        pretty_assertions::assert_eq!(resolved.into_tracks().len(), 10);
    }

    /// Never answers the first `hangs` link lookups, then succeeds.
    struct Unresponsive {
        hangs: u32,
        calls: std::sync::atomic::AtomicU32,
    }

    impl Unresponsive {
        fn new(hangs: u32) -> Self {
            Self {
                hangs,
                calls: std::sync::atomic::AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaResolverProvider for Unresponsive {
        async fn resolve_link(&self, url: &str) -> AudioSourceResult<LinkResolution> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if call <= self.hangs {
                std::future::pending::<()>().await;
            }
            Ok(LinkResolution::Single(track("Song A", url)))
        }

        async fn resolve_entry(&self, entry: &EntryStub) -> AudioSourceResult<Track> {
            Err(ResolutionError::NoStream(entry.url.clone()))
        }
    }

    fn timing_out(provider: Arc<Unresponsive>) -> TrackResolver {
        TrackResolver::new(
            provider,
            None,
            ResolverSettings {
                attempts: 3,
                attempt_timeout: Duration::from_secs(5),
                retry_delay: Duration::from_millis(10),
                workers: 2,
                max_playlist_entries: 10,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out_and_is_retried() {
        let provider = Arc::new(Unresponsive::new(1));

        let resolved = timing_out(provider.clone())
            .resolve("https://youtu.be/abc")
            .await;

        assert_matches!(resolved, Ok(ResolvedSet::Single(t)) if t.title == "Song A");
        pretty_assertions::assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_hanging_ends_in_timeout() {
        let provider = Arc::new(Unresponsive::new(u32::MAX));
        let started = tokio::time::Instant::now();

        let err = timing_out(provider.clone())
            .resolve("https://youtu.be/abc")
            .await
            .unwrap_err();

        pretty_assertions::assert_eq!(err, ResolutionError::Timeout(Duration::from_secs(5)));
        pretty_assertions::assert_eq!(provider.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }
}
