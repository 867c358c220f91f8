//! Error types for playback and queue operations.
//!
//! Every variant is local to the command that triggered it: a failed
//! operation leaves the playback state exactly as it was before the attempt.
//! "Nothing is playing" is not represented here; operations that need an
//! active track report it through their outcome enums instead.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The query could not be turned into a playable track.
    #[error("could not resolve '{query}': {reason}")]
    Resolution { query: String, reason: String },

    /// The resolver did not answer within the configured bound.
    #[error("resolving '{query}' timed out after {}s", .timeout.as_secs())]
    ResolutionTimeout { query: String, timeout: Duration },

    #[error("volume must be between 0 and 100, got {0}")]
    VolumeOutOfRange(i64),

    #[error("no track at position {index} (queue has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("queue is full ({max} tracks)")]
    QueueFull { max: usize },

    /// The audio sink refused to start a stream.
    #[error("failed to start '{title}': {reason}")]
    PlaybackStart { title: String, reason: String },

    /// Joining the voice channel failed.
    #[error("voice connection failed: {0}")]
    Connection(String),
}

impl PlaybackError {
    /// True for the errors that describe bad user input rather than a
    /// failure of an external service.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::VolumeOutOfRange(_) | PlaybackError::IndexOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_are_classified() {
        assert!(PlaybackError::VolumeOutOfRange(101).is_range_error());
        assert!(PlaybackError::IndexOutOfRange { index: 3, len: 1 }.is_range_error());
        assert!(!PlaybackError::QueueFull { max: 10 }.is_range_error());
    }

    #[test]
    fn timeout_message_mentions_seconds() {
        let err = PlaybackError::ResolutionTimeout {
            query: "song".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "resolving 'song' timed out after 30s");
    }
}
