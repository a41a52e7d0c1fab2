//! Bounded play history with a back/forward cursor.
//!
//! Stepping forward replays history until the cursor reaches the newest
//! entry; only then is a fresh item drawn from the playlist. Stepping back
//! from the oldest entry wraps to the newest.

use crate::engine::Playlist;
use crate::error::{EngineError, Result};
use crate::tiered::Location;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::hash::Hash;

pub const DEFAULT_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayHistory<T> {
    /// Oldest first
    entries: VecDeque<T>,
    /// `None` before anything has been played
    cursor: Option<usize>,
    max_size: usize,
}

impl<T> Default for PlayHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl<T> PlayHistory<T> {
    /// History keeping at most `max_size` entries (at least one)
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size),
            cursor: None,
            max_size,
        }
    }

    /// Entry under the cursor
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step back one entry, wrapping from the oldest to the newest.
    pub fn previous(&mut self) -> Option<&T> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            Some(c) if c > 0 => c - 1,
            _ => self.entries.len() - 1,
        };
        self.cursor = Some(index);
        self.entries.get(index)
    }

    /// Append an entry and move the cursor onto it; the oldest entry is
    /// dropped when full.
    pub fn push(&mut self, item: T) {
        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(item);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Keep only entries matching `keep`. The cursor stays on its entry if it
    /// survives, otherwise on the nearest older survivor.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let old_cursor = self.cursor;
        let mut survivors_up_to_cursor = 0;
        let mut index = 0;
        self.entries.retain(|entry| {
            let kept = keep(entry);
            if kept && old_cursor.is_some_and(|c| index <= c) {
                survivors_up_to_cursor += 1;
            }
            index += 1;
            kept
        });
        self.cursor = match (old_cursor, survivors_up_to_cursor) {
            (None, _) => None,
            (Some(_), 0) => (!self.entries.is_empty()).then_some(0),
            (Some(_), n) => Some(n - 1),
        };
    }
}

impl<T: Clone + Eq + Hash> PlayHistory<T> {
    /// Step forward. Replays the next history entry if the cursor is not at
    /// the newest one, otherwise draws from `playlist` and records the draw.
    pub fn next<R: Rng>(&mut self, playlist: &mut Playlist<T, R>) -> Option<T> {
        let next_index = self.cursor.map_or(0, |c| c + 1);
        if let Some(entry) = self.entries.get(next_index) {
            self.cursor = Some(next_index);
            return Some(entry.clone());
        }
        let item = playlist.select()?;
        self.push(item.clone());
        Some(item)
    }

    /// Reinforce the entry under the cursor.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCollection`] if nothing is current, otherwise the
    /// errors of [`Playlist::reinforce`].
    pub fn reinforce_current<R: Rng>(
        &self,
        playlist: &mut Playlist<T, R>,
        percent: f64,
    ) -> Result<Location> {
        playlist.reinforce(self.require_current()?, percent)
    }

    /// Suppress the entry under the cursor.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCollection`] if nothing is current, otherwise the
    /// errors of [`Playlist::suppress`].
    pub fn suppress_current<R: Rng>(
        &self,
        playlist: &mut Playlist<T, R>,
        percent: f64,
    ) -> Result<Location> {
        playlist.suppress(self.require_current()?, percent)
    }

    fn require_current(&self) -> Result<&T> {
        self.current()
            .ok_or_else(|| EngineError::EmptyCollection("nothing has been played yet".to_string()))
    }
}
