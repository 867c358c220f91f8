//! # Audio Module
//!
//! Playback for the bot's single voice channel.
//!
//! ## Architecture
//!
//! ### [`player`] - Playback Controller
//! - Owns the queue, current track, repeat flag and volume
//! - Runs the advance protocol when a track ends or the first track is queued
//! - Retries failed starts a bounded number of times
//!
//! ### [`queue`] - Queue
//! - Pending tracks in play order with positional insert
//!
//! ### [`sink`] - Audio Output
//! - [`sink::AudioSink`] seam between the controller and the voice connection
//! - [`sink::SongbirdSink`] streaming resolved tracks through songbird
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! # use crate::audio::player::PlaybackController;
//! # async fn example(controller: PlaybackController) -> anyhow::Result<()> {
//! let outcome = controller.enqueue("iu palette", None).await?;
//! println!("queued {} at {}", outcome.track.title(), outcome.position);
//!
//! controller.pause_or_resume().await;
//! controller.skip().await;
//! # Ok(())
//! # }
//! ```

pub mod player;
pub mod queue;
pub mod sink;
