use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::MusicQueue,
        sink::{AudioSink, SinkEvent},
    },
    config::Config,
    error::PlaybackError,
    sources::{Track, TrackResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    /// A track is being picked or started on the sink.
    Starting,
    Playing,
    Paused,
}

/// Messages for the text channel, published as playback progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotice {
    NowPlaying(Track),
    /// The track could not be started even after retrying and was dropped.
    TrackFailed { track: Track, reason: String },
    QueueFinished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueOutcome {
    pub track: Track,
    pub position: usize,
    pub started: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipOutcome {
    Skipped(Track),
    NotPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeOutcome {
    Applied(f32),
    /// Stored for the next track; nothing was playing to apply it to.
    NotPlaying(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    Resumed,
    Idle,
}

/// Read-only copy of the playback state for display.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub queue: Vec<Track>,
    pub current: Option<Track>,
    pub status: PlayerStatus,
    pub repeat: bool,
    pub volume: f32,
    pub connected: bool,
    pub queue_duration: Duration,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status != PlayerStatus::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.status == PlayerStatus::Paused
    }
}

#[derive(Debug, Clone, Copy)]
struct ControllerSettings {
    resolve_timeout: Duration,
    retry_delay: Duration,
    max_retries: u32,
}

#[derive(Debug)]
struct PlaybackState {
    queue: MusicQueue,
    current: Option<Track>,
    status: PlayerStatus,
    repeat: bool,
    volume: f32,
    /// Bumped on every start attempt and on stop. Sink events and
    /// in-flight advances carrying an older id are ignored.
    playback_id: u64,
    connected: bool,
}

impl PlaybackState {
    fn next_track(&mut self) -> Option<Track> {
        if self.repeat {
            if let Some(current) = &self.current {
                info!("🔂 Repeating: {}", current.title());
                return Some(current.clone());
            }
        }
        self.queue.pop_front()
    }
}

/// Owns the single playback state of the bot: queue, current track, repeat
/// flag and volume.
///
/// Every mutation goes through one async mutex. Track resolution happens
/// before that mutex is taken, joining and starting a stream happen with it
/// released, and sink completions arrive as [`SinkEvent`]s consumed by
/// [`PlaybackController::spawn_event_loop`]. Each start attempt carries a
/// fresh playback id, so a `stop` or `skip` issued meanwhile supersedes it.
///
/// ## Advance protocol
///
/// When the current track ends (or the first track is queued while idle):
/// 1. with repeat on and a current track, replay it;
/// 2. otherwise start the front of the queue;
/// 3. otherwise go idle and leave the voice channel.
///
/// A start failure is retried after a fixed delay, up to the configured
/// number of retries, after which the track is dropped and the protocol
/// continues with the next one.
#[derive(Clone)]
pub struct PlaybackController {
    state: Arc<Mutex<PlaybackState>>,
    resolver: Arc<dyn TrackResolver>,
    sink: Arc<dyn AudioSink>,
    notices: mpsc::UnboundedSender<PlayerNotice>,
    settings: ControllerSettings,
}

impl PlaybackController {
    pub fn new(
        config: &Config,
        resolver: Arc<dyn TrackResolver>,
        sink: Arc<dyn AudioSink>,
        notices: mpsc::UnboundedSender<PlayerNotice>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlaybackState {
                queue: MusicQueue::new(config.max_queue_size),
                current: None,
                status: PlayerStatus::Idle,
                repeat: false,
                volume: config.default_volume,
                playback_id: 0,
                connected: false,
            })),
            resolver,
            sink,
            notices,
            settings: ControllerSettings {
                resolve_timeout: config.resolve_timeout(),
                retry_delay: config.playback_retry_delay(),
                max_retries: config.max_playback_retries,
            },
        }
    }

    /// Consumes sink events until the sender side is dropped.
    pub fn spawn_event_loop(&self, mut events: mpsc::UnboundedReceiver<SinkEvent>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SinkEvent::TrackEnded { playback_id } => controller.on_track_end(playback_id).await,
                }
            }
            debug!("Sink event channel closed");
        })
    }

    /// Resolves `query` and queues the result at `position` (clamped), or at
    /// the back. Starts playback when the player was idle.
    pub async fn enqueue(&self, query: &str, position: Option<usize>) -> Result<EnqueueOutcome, PlaybackError> {
        let track = self.resolve(query).await?;

        let (position, start_epoch) = {
            let mut state = self.state.lock().await;
            let position = state.queue.insert(track.clone(), position)?;
            debug!("📋 {} tracks waiting", state.queue.len());
            let start_epoch = if state.status == PlayerStatus::Idle {
                state.status = PlayerStatus::Starting;
                Some(state.playback_id)
            } else {
                None
            };
            (position, start_epoch)
        };

        if let Some(epoch) = start_epoch {
            self.advance(epoch).await;
        }

        Ok(EnqueueOutcome {
            track,
            position,
            started: start_epoch.is_some(),
        })
    }

    async fn resolve(&self, query: &str) -> Result<Track, PlaybackError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlaybackError::Resolution {
                query: String::new(),
                reason: "empty query".to_string(),
            });
        }

        match tokio::time::timeout(self.settings.resolve_timeout, self.resolver.resolve(query)).await {
            Ok(Ok(track)) => Ok(track),
            Ok(Err(e)) => {
                warn!("❌ Could not resolve '{}': {:#}", query, e);
                Err(PlaybackError::Resolution {
                    query: query.to_string(),
                    reason: format!("{:#}", e),
                })
            }
            Err(_) => {
                warn!("⏰ Resolving '{}' timed out", query);
                Err(PlaybackError::ResolutionTimeout {
                    query: query.to_string(),
                    timeout: self.settings.resolve_timeout,
                })
            }
        }
    }

    /// Handles the end of the stream started with `playback_id`.
    pub async fn on_track_end(&self, playback_id: u64) {
        let epoch = {
            let mut state = self.state.lock().await;
            let active = matches!(state.status, PlayerStatus::Playing | PlayerStatus::Paused);
            if state.playback_id != playback_id || !active {
                debug!("Ignoring stale end of track {}", playback_id);
                return;
            }
            state.status = PlayerStatus::Starting;
            state.playback_id
        };

        self.advance(epoch).await;
    }

    async fn advance(&self, mut epoch: u64) {
        let mut retry: Option<Track> = None;
        let mut failures: u32 = 0;

        loop {
            let (track, needs_connect, volume) = {
                let mut state = self.state.lock().await;
                if state.playback_id != epoch || state.status != PlayerStatus::Starting {
                    debug!("Advance superseded (epoch {})", epoch);
                    return;
                }

                let track = match retry.take() {
                    Some(track) => track,
                    None => match state.next_track() {
                        Some(track) => track,
                        None => {
                            self.go_idle(&mut state).await;
                            return;
                        }
                    },
                };

                state.playback_id += 1;
                epoch = state.playback_id;
                state.current = Some(track.clone());
                (track, !state.connected, state.volume)
            };

            // Joining and probing the stream can take seconds; commands keep
            // running meanwhile and may supersede this attempt.
            let (joined, started) = self.start_on_sink(&track, needs_connect, volume, epoch).await;

            let mut state = self.state.lock().await;
            if joined {
                state.connected = true;
            }

            if state.playback_id != epoch {
                debug!("Start of '{}' superseded", track.title());
                if state.status == PlayerStatus::Idle {
                    if started.is_ok() {
                        if let Err(e) = self.sink.stop() {
                            debug!("Nothing to stop on sink: {:?}", e);
                        }
                    }
                    self.release_connection(&mut state).await;
                }
                return;
            }

            match started {
                Ok(()) => {
                    state.status = PlayerStatus::Playing;
                    if state.volume != volume {
                        if let Err(e) = self.sink.set_volume(state.volume) {
                            warn!("Could not apply volume: {:?}", e);
                        }
                    }
                    info!("🎵 Now playing: {}", track.title());
                    self.notify(PlayerNotice::NowPlaying(track));
                    return;
                }
                Err(e) if failures >= self.settings.max_retries => {
                    error!("🚫 Giving up on '{}' after {} attempts: {}", track.title(), failures + 1, e);
                    state.current = None;
                    failures = 0;
                    self.notify(PlayerNotice::TrackFailed {
                        track,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "🔄 Start failed ({}/{}), retrying '{}' in {:?}: {}",
                        failures,
                        self.settings.max_retries,
                        track.title(),
                        self.settings.retry_delay,
                        e
                    );
                    retry = Some(track);
                    drop(state);
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    /// Joins the voice channel if needed and starts `track`. Runs without the
    /// state lock; the first value tells whether this call joined.
    async fn start_on_sink(
        &self,
        track: &Track,
        connect: bool,
        volume: f32,
        playback_id: u64,
    ) -> (bool, Result<(), PlaybackError>) {
        if connect {
            if let Err(e) = self.sink.connect().await {
                return (false, Err(e));
            }
        }
        (connect, self.sink.play(track, volume, playback_id).await)
    }

    async fn go_idle(&self, state: &mut PlaybackState) {
        state.current = None;
        state.status = PlayerStatus::Idle;
        self.release_connection(state).await;
        info!("📭 Queue finished");
        self.notify(PlayerNotice::QueueFinished);
    }

    async fn release_connection(&self, state: &mut PlaybackState) {
        if state.connected {
            if let Err(e) = self.sink.disconnect().await {
                warn!("Error leaving voice channel: {:?}", e);
            }
            state.connected = false;
        }
    }

    /// Stops the current stream; the regular end-of-track handling then
    /// picks what plays next.
    pub async fn skip(&self) -> SkipOutcome {
        let (epoch, skipped) = {
            let mut state = self.state.lock().await;
            let current = match (state.status, &state.current) {
                (PlayerStatus::Playing | PlayerStatus::Paused, Some(current)) => current.clone(),
                _ => return SkipOutcome::NotPlaying,
            };

            info!("⏭️ Skipping: {}", current.title());
            if let Err(e) = self.sink.stop() {
                // No end event will come, advance here instead
                warn!("Could not stop stream, advancing directly: {:?}", e);
                state.status = PlayerStatus::Starting;
                (state.playback_id, current)
            } else {
                return SkipOutcome::Skipped(current);
            }
        };

        self.advance(epoch).await;
        SkipOutcome::Skipped(skipped)
    }

    pub async fn remove(&self, index: usize) -> Result<Track, PlaybackError> {
        let mut state = self.state.lock().await;
        state.queue.remove(index)
    }

    /// Moves a queued track to another position. Returns the track and the
    /// index it ended up at.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<(Track, usize), PlaybackError> {
        let mut state = self.state.lock().await;
        state.queue.move_item(from, to)
    }

    /// Empties the queue without touching the current track.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        state.queue.clear()
    }

    /// Stops playback, drops the queue and leaves the voice channel. The
    /// repeat flag is kept.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.playback_id += 1;
        state.queue.clear();
        state.status = PlayerStatus::Idle;

        if state.current.take().is_some() {
            if let Err(e) = self.sink.stop() {
                debug!("Nothing to stop on sink: {:?}", e);
            }
        }

        self.release_connection(&mut state).await;
        info!("⏹️ Playback stopped");
    }

    /// Called when the bot was removed from the voice channel by someone
    /// else. Same effect as [`stop`](Self::stop), unless the controller had
    /// already released the connection itself.
    pub async fn handle_external_disconnect(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            if !state.connected {
                return false;
            }
            // Voice is already gone, nothing to leave
            state.connected = false;
        }

        warn!("🔌 Disconnected from voice externally, stopping playback");
        self.stop().await;
        true
    }

    pub async fn toggle_repeat(&self) -> bool {
        let mut state = self.state.lock().await;
        state.repeat = !state.repeat;
        if state.repeat {
            info!("🔂 Repeat current track enabled");
        } else {
            info!("➡️ Repeat disabled");
        }
        state.repeat
    }

    /// Sets the volume from a 0..=100 percentage.
    pub async fn set_volume(&self, percent: i64) -> Result<VolumeOutcome, PlaybackError> {
        if !(0..=100).contains(&percent) {
            return Err(PlaybackError::VolumeOutOfRange(percent));
        }

        let volume = percent as f32 / 100.0;
        let mut state = self.state.lock().await;
        state.volume = volume;

        match state.status {
            PlayerStatus::Playing | PlayerStatus::Paused => {
                if let Err(e) = self.sink.set_volume(volume) {
                    warn!("Could not apply volume: {:?}", e);
                }
                info!("🔊 Volume set to {}%", percent);
                Ok(VolumeOutcome::Applied(volume))
            }
            _ => Ok(VolumeOutcome::NotPlaying(volume)),
        }
    }

    pub async fn pause_or_resume(&self) -> PauseOutcome {
        let mut state = self.state.lock().await;
        match state.status {
            PlayerStatus::Playing => {
                if let Err(e) = self.sink.pause() {
                    warn!("Could not pause: {:?}", e);
                }
                state.status = PlayerStatus::Paused;
                info!("⏸️ Paused");
                PauseOutcome::Paused
            }
            PlayerStatus::Paused => {
                if let Err(e) = self.sink.resume() {
                    warn!("Could not resume: {:?}", e);
                }
                state.status = PlayerStatus::Playing;
                info!("▶️ Resumed");
                PauseOutcome::Resumed
            }
            PlayerStatus::Idle | PlayerStatus::Starting => PauseOutcome::Idle,
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.state.lock().await;
        PlaybackSnapshot {
            queue: state.queue.tracks(),
            current: state.current.clone(),
            status: state.status,
            repeat: state.repeat,
            volume: state.volume,
            connected: state.connected,
            queue_duration: state.queue.total_duration(),
        }
    }

    fn notify(&self, notice: PlayerNotice) {
        if self.notices.send(notice).is_err() {
            debug!("No listener for player notices");
        }
    }
}
