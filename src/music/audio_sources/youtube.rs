//! Providers backed by the `yt-dlp` command-line tool.
//!
//! `yt-dlp -J` prints one JSON document describing either a single video or a
//! playlist. Playlist links are listed with `--flat-playlist`, which only
//! reads the entry stubs; every other link is read with `--no-playlist`.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::{
    AudioSource, AudioSourceResult, CatalogSearchProvider, EntryStub, LinkResolution,
    MediaResolverProvider,
};
use crate::music::error::ResolutionError;
use crate::music::track::Track;

/// The subset of `yt-dlp --dump-single-json` output we read.
#[derive(Debug, Default, Deserialize)]
struct YtDlpInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
    live_status: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    entries: Vec<YtDlpInfo>,
}

impl YtDlpInfo {
    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist")
    }

    fn is_live(&self) -> bool {
        self.is_live.unwrap_or(false) || self.live_status.as_deref() == Some("is_live")
    }

    /// The page URL, which stays valid longer than the raw media URL.
    fn page_url(&self) -> Option<String> {
        self.webpage_url
            .clone()
            .or_else(|| self.original_url.clone())
            .or_else(|| self.url.clone())
            .or_else(|| {
                self.id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })
    }

    fn into_track(self, query: &str) -> AudioSourceResult<Track> {
        let stream = self
            .page_url()
            .ok_or_else(|| ResolutionError::NoStream(query.to_string()))?;
        let is_live = self.is_live();
        let duration = if is_live {
            None
        } else {
            self.duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(Duration::from_secs_f64)
        };

        Ok(Track::new(self.title.as_deref(), &stream, is_live, query)?.with_duration(duration))
    }

    fn into_resolution(self, query: &str) -> AudioSourceResult<LinkResolution> {
        if !self.is_playlist() {
            return self.into_track(query).map(LinkResolution::Single);
        }

        let entries = self
            .entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry.page_url()?;
                Some((url, entry.title))
            })
            .enumerate()
            .map(|(i, (url, title))| EntryStub {
                index: i + 1,
                url,
                title,
            })
            .collect::<Vec<_>>();

        if entries.is_empty() {
            return Err(ResolutionError::EmptyPlaylist);
        }

        Ok(LinkResolution::Playlist {
            title: self.title,
            entries,
        })
    }
}

fn parse_info(stdout: &[u8]) -> AudioSourceResult<YtDlpInfo> {
    serde_json::from_slice(stdout).map_err(|e| {
        ResolutionError::Parse(format!("Failed to parse yt-dlp output: {}", e))
    })
}

/// Map a failed run onto the error taxonomy. Unavailable media is permanent;
/// anything else might succeed on another attempt.
fn failure_from_stderr(query: &str, stderr: &str) -> ResolutionError {
    const PERMANENT: [&str; 5] = [
        "Video unavailable",
        "Private video",
        "is not available",
        "Unsupported URL",
        "members-only",
    ];

    if PERMANENT.iter().any(|p| stderr.contains(p)) {
        ResolutionError::NoStream(query.to_string())
    } else {
        let line = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("yt-dlp exited with an error");
        ResolutionError::Provider(line.trim().to_string())
    }
}

/// Runs `yt-dlp` for links and playlist entries.
#[derive(Debug, Clone)]
pub struct YtDlpProvider {
    binary: String,
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpProvider {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn dump_json(&self, target: &str, extra: &[&str]) -> AudioSourceResult<YtDlpInfo> {
        debug!("Running {} -J {:?} {}", self.binary, extra, target);

        let output = Command::new(&self.binary)
            .arg("-J")
            .args(extra)
            .arg(target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ResolutionError::Provider(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure_from_stderr(target, &stderr));
        }

        parse_info(&output.stdout)
    }
}

#[async_trait]
impl MediaResolverProvider for YtDlpProvider {
    async fn resolve_link(&self, url: &str) -> AudioSourceResult<LinkResolution> {
        let flags: &[&str] = if AudioSource::is_playlist_link(url) {
            &["--flat-playlist"]
        } else {
            &["--no-playlist"]
        };

        let info = self.dump_json(url, flags).await?;
        info!("yt-dlp resolved {} ({:?})", url, info.title);
        info.into_resolution(url)
    }

    async fn resolve_entry(&self, entry: &EntryStub) -> AudioSourceResult<Track> {
        let info = self.dump_json(&entry.url, &["--no-playlist"]).await?;
        let mut track = info.into_track(&entry.url)?;
        if track.title == entry.url {
            if let Some(title) = entry.title.as_deref().filter(|t| !t.trim().is_empty()) {
                track.title = title.trim().to_string();
            }
        }
        Ok(track)
    }
}

/// Keyword search through `yt-dlp`'s `ytsearch1:` pseudo-URL.
#[derive(Debug, Clone, Default)]
pub struct YtDlpSearch {
    provider: YtDlpProvider,
}

impl YtDlpSearch {
    pub fn new(provider: YtDlpProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CatalogSearchProvider for YtDlpSearch {
    async fn search(&self, text: &str) -> AudioSourceResult<Option<Track>> {
        let search_param = format!("ytsearch1:{}", text);
        let info = self
            .provider
            .dump_json(&search_param, &["--flat-playlist"])
            .await?;
        top_hit(info, text)
    }
}

fn top_hit(info: YtDlpInfo, query: &str) -> AudioSourceResult<Option<Track>> {
    let hit = if info.is_playlist() {
        info.entries.into_iter().next()
    } else {
        Some(info)
    };

    hit.map(|entry| entry.into_track(query)).transpose()
}
