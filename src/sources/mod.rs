pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use ytdlp::YtDlpResolver;

/// Turns a free-text query or a direct URL into a playable [`Track`].
///
/// Implementations may be slow (network, subprocesses); callers are expected
/// to run them outside any lock and to bound them with a timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Track>;
}

/// A resolved, playable unit of audio. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    stream_url: String,
    duration_secs: u64,
    page_url: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, stream_url: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
            duration_secs,
            page_url: None,
        }
    }

    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Direct media URL handed to the audio sink. These expire after a few
    /// hours for most providers.
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Human-facing page the track was found on, if the resolver knew it.
    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }
}

/// True when the query should be handed to the resolver as-is instead of
/// being searched for.
pub fn is_direct_url(query: &str) -> bool {
    url::Url::parse(query.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}
