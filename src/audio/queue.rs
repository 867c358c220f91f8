use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::{error::PlaybackError, sources::Track};

/// Pending tracks in play order. The front is the next track to play; the
/// track currently playing is never stored here.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Inserts a track at `position`, or at the back when no position is
    /// given. Positions past the end are clamped to the back.
    ///
    /// Returns the index the track ended up at.
    pub fn insert(&mut self, track: Track, position: Option<usize>) -> Result<usize, PlaybackError> {
        if self.items.len() >= self.max_size {
            return Err(PlaybackError::QueueFull { max: self.max_size });
        }

        let index = position
            .map(|pos| pos.min(self.items.len()))
            .unwrap_or(self.items.len());

        info!("➕ Queued at {}: {}", index, track.title());
        self.items.insert(index, track);
        Ok(index)
    }

    /// Takes the next track in FIFO order.
    pub fn pop_front(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        match &next {
            Some(track) => debug!("➡️ Next in queue: {}", track.title()),
            None => debug!("📭 Queue empty"),
        }
        next
    }

    pub fn remove(&mut self, index: usize) -> Result<Track, PlaybackError> {
        let len = self.items.len();
        let track = self
            .items
            .remove(index)
            .ok_or(PlaybackError::IndexOutOfRange { index, len })?;
        debug!("❌ Removed position {}: {}", index, track.title());
        Ok(track)
    }

    /// Moves the entry at `from` to `to`, clamping `to` to the back.
    /// Returns the moved track and the index it ended up at.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(Track, usize), PlaybackError> {
        let len = self.items.len();
        let track = self
            .items
            .remove(from)
            .ok_or(PlaybackError::IndexOutOfRange { index: from, len })?;
        let to = to.min(self.items.len());
        debug!("↕️ Moved {} from {} to {}", track.title(), from, to);
        self.items.insert(to, track.clone());
        Ok((track, to))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        info!("🗑️ Queue cleared ({} tracks)", removed);
        removed
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.items.iter().map(Track::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(title: &str) -> Track {
        Track::new(title, format!("https://cdn.example/{title}"), 60)
    }

    fn titles(queue: &MusicQueue) -> Vec<String> {
        queue.tracks().iter().map(|t| t.title().to_string()).collect()
    }

    #[test]
    fn positional_insert_is_stable_and_clamped() {
        let mut queue = MusicQueue::new(10);
        assert_eq!(queue.insert(track("A"), None).unwrap(), 0);
        assert_eq!(queue.insert(track("B"), Some(0)).unwrap(), 0);
        assert_eq!(titles(&queue), vec!["B", "A"]);

        assert_eq!(queue.insert(track("C"), Some(1)).unwrap(), 1);
        assert_eq!(titles(&queue), vec!["B", "C", "A"]);

        // Past the end behaves like append
        assert_eq!(queue.insert(track("D"), Some(99)).unwrap(), 3);
        assert_eq!(titles(&queue), vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn pops_in_fifo_order() {
        let mut queue = MusicQueue::new(10);
        queue.insert(track("A"), None).unwrap();
        queue.insert(track("B"), None).unwrap();
        assert_eq!(queue.pop_front().unwrap().title(), "A");
        assert_eq!(queue.pop_front().unwrap().title(), "B");
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn remove_out_of_range_leaves_queue_untouched() {
        let mut queue = MusicQueue::new(10);
        queue.insert(track("A"), None).unwrap();
        queue.insert(track("B"), None).unwrap();

        let err = queue.remove(2).unwrap_err();
        assert!(matches!(err, PlaybackError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(titles(&queue), vec!["A", "B"]);

        assert_eq!(queue.remove(0).unwrap().title(), "A");
        assert_eq!(titles(&queue), vec!["B"]);
    }

    #[test]
    fn move_item_reorders_and_clamps() {
        let mut queue = MusicQueue::new(10);
        for title in ["A", "B", "C"] {
            queue.insert(track(title), None).unwrap();
        }

        assert_eq!(queue.move_item(2, 0).unwrap().1, 0);
        assert_eq!(titles(&queue), vec!["C", "A", "B"]);

        assert_eq!(queue.move_item(0, 99).unwrap().1, 2);
        assert_eq!(titles(&queue), vec!["A", "B", "C"]);

        assert!(matches!(
            queue.move_item(3, 0),
            Err(PlaybackError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(titles(&queue), vec!["A", "B", "C"]);
    }

    #[test]
    fn full_queue_rejects_insert() {
        let mut queue = MusicQueue::new(1);
        queue.insert(track("A"), None).unwrap();
        assert!(matches!(
            queue.insert(track("B"), Some(0)),
            Err(PlaybackError::QueueFull { max: 1 })
        ));
        assert_eq!(titles(&queue), vec!["A"]);
    }

    #[test]
    fn clear_reports_count_and_totals_reset() {
        let mut queue = MusicQueue::new(10);
        queue.insert(track("A"), None).unwrap();
        queue.insert(track("B"), None).unwrap();
        assert_eq!(queue.total_duration(), Duration::from_secs(120));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.total_duration(), Duration::ZERO);
    }
}
