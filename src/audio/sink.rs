use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::TrackHandle,
    Event, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    bot::events::{TrackEndHandler, TrackErrorHandler},
    error::PlaybackError,
    sources::Track,
};

/// How long a stream may take to become playable before the start counts
/// as failed.
const PLAYABLE_TIMEOUT: Duration = Duration::from_secs(20);

/// Events raised by the sink from its own threads. They are forwarded to the
/// controller's event loop and never touch playback state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// The stream started with this id finished, errored or was stopped.
    TrackEnded { playback_id: u64 },
}

/// Audio output on a voice connection.
///
/// `play` must report [`SinkEvent::TrackEnded`] with the given
/// `playback_id` once the stream ends for any reason.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn connect(&self) -> Result<(), PlaybackError>;

    async fn play(&self, track: &Track, volume: f32, playback_id: u64) -> Result<(), PlaybackError>;

    fn pause(&self) -> Result<()>;

    fn resume(&self) -> Result<()>;

    /// Stops the active stream. Its end event still fires.
    fn stop(&self) -> Result<()>;

    fn set_volume(&self, volume: f32) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

/// [`AudioSink`] backed by a songbird call in a fixed voice channel.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    channel_id: ChannelId,
    http: reqwest::Client,
    /// Handle of the newest started stream and its playback id.
    current: Mutex<Option<(u64, TrackHandle)>>,
    events: mpsc::UnboundedSender<SinkEvent>,
}

impl SongbirdSink {
    pub fn new(
        manager: Arc<Songbird>,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: mpsc::UnboundedSender<SinkEvent>,
    ) -> Self {
        Self {
            manager,
            guild_id,
            channel_id,
            http: reqwest::Client::new(),
            current: Mutex::new(None),
            events,
        }
    }

    fn with_current<F, E>(&self, action: &str, f: F) -> Result<()>
    where
        F: FnOnce(&TrackHandle) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let current = self.current.lock();
        let (_, handle) = current
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no active track to {}", action))?;
        f(handle).map_err(|e| anyhow::anyhow!("could not {} track: {}", action, e))
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn connect(&self) -> Result<(), PlaybackError> {
        // Also rejoins a call left behind by an external disconnect
        self.manager
            .join(self.guild_id, self.channel_id)
            .await
            .map_err(|e| PlaybackError::Connection(e.to_string()))?;

        info!("🔊 Joined voice channel {} in guild {}", self.channel_id, self.guild_id);
        Ok(())
    }

    async fn play(&self, track: &Track, volume: f32, playback_id: u64) -> Result<(), PlaybackError> {
        let call = self
            .manager
            .get(self.guild_id)
            .ok_or_else(|| PlaybackError::Connection("not connected to voice".to_string()))?;

        let input = Input::from(HttpRequest::new(self.http.clone(), track.stream_url().to_string()));

        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        let start_failed = |reason: String| PlaybackError::PlaybackStart {
            title: track.title().to_string(),
            reason,
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndHandler {
                    playback_id,
                    events: self.events.clone(),
                },
            )
            .map_err(|e| start_failed(e.to_string()))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorHandler {
                    playback_id,
                    events: self.events.clone(),
                },
            )
            .map_err(|e| start_failed(e.to_string()))?;

        if let Err(e) = handle.set_volume(volume) {
            warn!("Could not set initial volume: {}", e);
        }

        match tokio::time::timeout(PLAYABLE_TIMEOUT, handle.make_playable_async()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.stop();
                return Err(start_failed(e.to_string()));
            }
            Err(_) => {
                let _ = handle.stop();
                return Err(start_failed(format!(
                    "stream not ready after {}s",
                    PLAYABLE_TIMEOUT.as_secs()
                )));
            }
        }

        let mut current = self.current.lock();
        match current.as_ref() {
            // A newer start finished first; this stream is already superseded
            Some((newer, _)) if *newer > playback_id => {
                debug!("Dropping stream {} behind newer stream {}", playback_id, newer);
                let _ = handle.stop();
            }
            _ => {
                if let Some((_, previous)) = current.replace((playback_id, handle)) {
                    let _ = previous.stop();
                }
            }
        }

        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.with_current("pause", |h| h.pause())
    }

    fn resume(&self) -> Result<()> {
        self.with_current("resume", |h| h.play())
    }

    fn stop(&self) -> Result<()> {
        let (_, handle) = self
            .current
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("no active track to stop"))?;
        handle
            .stop()
            .map_err(|e| anyhow::anyhow!("could not stop track: {}", e))
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        self.with_current("set volume on", |h| h.set_volume(volume))
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some((_, handle)) = self.current.lock().take() {
            let _ = handle.stop();
        }

        match self.manager.remove(self.guild_id).await {
            Ok(()) | Err(songbird::error::JoinError::NoCall) => {
                info!("👋 Left voice channel in guild {}", self.guild_id);
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("could not leave voice channel: {}", e)),
        }
    }
}
