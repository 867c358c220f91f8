use serenity::async_trait;
use songbird::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::audio::sink::SinkEvent;

/// Forwards the end of a track to the playback controller.
///
/// Runs on songbird's event thread, so it only posts a message; the
/// controller's event loop does the actual state transition.
pub struct TrackEndHandler {
    pub playback_id: u64,
    pub events: mpsc::UnboundedSender<SinkEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!("🎵 Track {} ended", self.playback_id);

        if self
            .events
            .send(SinkEvent::TrackEnded {
                playback_id: self.playback_id,
            })
            .is_err()
        {
            warn!("Controller event loop is gone, dropping end of track {}", self.playback_id);
        }

        None
    }
}

/// Same as [`TrackEndHandler`] for tracks that died mid-stream, so a broken
/// stream still advances the queue.
pub struct TrackErrorHandler {
    pub playback_id: u64,
    pub events: mpsc::UnboundedSender<SinkEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                error!("❌ Track {} errored: {:?}", self.playback_id, state.playing);
            }
        }

        let _ = self.events.send(SinkEvent::TrackEnded {
            playback_id: self.playback_id,
        });

        None
    }
}
