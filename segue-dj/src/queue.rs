//! In-memory playback queue
//!
//! Owns the ordered list of tracks and the notion of "current". The
//! transition engine reads `current`/`next_up` and calls `advance` when a
//! handoff completes; the HTTP API mutates the list. No persistence: the
//! queue lives and dies with the process.

use segue_common::types::Track;
use tokio::sync::RwLock;
use tracing::debug;

/// Queue manager
pub struct QueueManager {
    inner: RwLock<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    tracks: Vec<Track>,
    current_index: Option<usize>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(QueueInner::default()),
        }
    }

    /// Append a track to the end of the queue.
    pub async fn enqueue(&self, track: Track) {
        let mut inner = self.inner.write().await;
        debug!("enqueue: {} - {}", track.artist, track.title);
        inner.tracks.push(track);
    }

    /// The track currently considered playing, if any.
    pub async fn current(&self) -> Option<Track> {
        let inner = self.inner.read().await;
        inner.current_index.and_then(|i| inner.tracks.get(i).cloned())
    }

    /// The track after current, if any. This is the transition target.
    pub async fn next_up(&self) -> Option<Track> {
        let inner = self.inner.read().await;
        match inner.current_index {
            Some(i) => inner.tracks.get(i + 1).cloned(),
            // Nothing playing yet: the head of the queue is next
            None => inner.tracks.first().cloned(),
        }
    }

    /// Move current to the given track id (explicit selection).
    ///
    /// Returns the track if present in the queue.
    pub async fn select(&self, track_id: &str) -> Option<Track> {
        let mut inner = self.inner.write().await;
        let index = inner.tracks.iter().position(|t| t.id == track_id)?;
        inner.current_index = Some(index);
        inner.tracks.get(index).cloned()
    }

    /// Advance current to the next track and return it.
    pub async fn advance(&self) -> Option<Track> {
        let mut inner = self.inner.write().await;
        let next_index = match inner.current_index {
            Some(i) => i + 1,
            None => 0,
        };
        if next_index < inner.tracks.len() {
            inner.current_index = Some(next_index);
            inner.tracks.get(next_index).cloned()
        } else {
            None
        }
    }

    /// Remove a track by id. Removing the current track clears "current";
    /// removing an earlier track shifts the current index to follow it.
    pub async fn remove(&self, track_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(index) = inner.tracks.iter().position(|t| t.id == track_id) else {
            return false;
        };
        inner.tracks.remove(index);
        inner.current_index = match inner.current_index {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        true
    }

    /// Move a track from one position to another.
    pub async fn reorder(&self, from: usize, to: usize) -> bool {
        let mut inner = self.inner.write().await;
        if from >= inner.tracks.len() || to >= inner.tracks.len() {
            return false;
        }
        let current_id = inner
            .current_index
            .and_then(|i| inner.tracks.get(i).map(|t| t.id.clone()));
        let track = inner.tracks.remove(from);
        inner.tracks.insert(to, track);
        // Keep "current" pointing at the same track after the shuffle of indices
        inner.current_index =
            current_id.and_then(|id| inner.tracks.iter().position(|t| t.id == id));
        true
    }

    /// Shuffle the not-yet-played tail of the queue (Fisher-Yates).
    pub async fn shuffle(&self) {
        use rand::seq::SliceRandom;
        let mut inner = self.inner.write().await;
        let start = inner.current_index.map(|i| i + 1).unwrap_or(0);
        let mut rng = rand::thread_rng();
        inner.tracks[start..].shuffle(&mut rng);
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.tracks.clear();
        inner.current_index = None;
    }

    pub async fn tracks(&self) -> Vec<Track> {
        self.inner.read().await.tracks.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tracks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tracks.is_empty()
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}
