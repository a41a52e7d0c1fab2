//! The playlist aggregate: a [`TieredSelector`] plus its random source and
//! configuration.
//!
//! [`Playlist`] takes the generator at construction, so a seeded generator
//! makes every draw reproducible. All mutation goes through `&mut self`;
//! [`SharedPlaylist`] puts one mutex around the whole aggregate (every tier
//! and the location index) for callers on several threads.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::tiered::{Location, SyncReport, TieredSelector, TieredState};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything needed to rebuild a [`Playlist`] except its random source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistState<T> {
    pub config: EngineConfig,
    pub selector: TieredState<T>,
}

/// Adaptive weighted-random playlist
///
/// # Examples
///
/// ```
/// use driftmix::config::EngineConfig;
/// use driftmix::engine::Playlist;
///
/// let mut playlist = Playlist::seeded(vec!["a", "b", "c"], EngineConfig::default(), 42)?;
/// let item = playlist.select().expect("playlist has items");
/// playlist.like(&item)?;
/// assert!(playlist.probability_of(&item).unwrap() > 1.0 / 3.0);
/// # Ok::<(), driftmix::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Playlist<T, R = StdRng> {
    selector: TieredSelector<T>,
    config: EngineConfig,
    rng: R,
}

impl<T: Clone + Eq + Hash> Playlist<T, StdRng> {
    /// Playlist drawing from an entropy-seeded generator
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::new`].
    pub fn new(items: Vec<T>, config: EngineConfig) -> Result<Self> {
        Self::with_rng(items, config, StdRng::from_entropy())
    }

    /// Playlist with a reproducible draw sequence
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::new`].
    pub fn seeded(items: Vec<T>, config: EngineConfig, seed: u64) -> Result<Self> {
        Self::with_rng(items, config, StdRng::seed_from_u64(seed))
    }
}

impl<T: Clone + Eq + Hash, R: Rng> Playlist<T, R> {
    /// # Errors
    ///
    /// - [`EngineError::EmptyCollection`] for no items
    /// - [`EngineError::DegenerateOperation`] for duplicate items
    /// - configuration errors from [`EngineConfig::validate`]
    pub fn with_rng(items: Vec<T>, config: EngineConfig, rng: R) -> Result<Self> {
        let selector = TieredSelector::new(items, &config)?;
        info!(
            "Created playlist with {} items over {} tiers",
            selector.len(),
            selector.tier_count()
        );
        Ok(Self {
            selector,
            config,
            rng,
        })
    }

    /// Rebuild from a snapshot with a fresh generator.
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::restore`].
    pub fn restore(state: PlaylistState<T>, rng: R) -> Result<Self> {
        let selector = TieredSelector::restore(state.selector, &state.config).map_err(|e| {
            warn!("Rejected playlist snapshot: {e}");
            e
        })?;
        debug!("Restored playlist with {} items", selector.len());
        Ok(Self {
            selector,
            config: state.config,
            rng,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaylistState<T> {
        PlaylistState {
            config: self.config.clone(),
            selector: self.selector.snapshot(),
        }
    }

    /// Draw the next item; `None` only when nothing is tracked.
    pub fn select(&mut self) -> Option<T> {
        self.selector.select(&mut self.rng)
    }

    /// # Errors
    ///
    /// See [`TieredSelector::reinforce`].
    pub fn reinforce(&mut self, item: &T, percent: f64) -> Result<Location> {
        self.selector.reinforce(item, percent)
    }

    /// # Errors
    ///
    /// See [`TieredSelector::suppress`].
    pub fn suppress(&mut self, item: &T, percent: f64) -> Result<Location> {
        self.selector.suppress(item, percent)
    }

    /// Reinforce by the configured adaptation percent
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::reinforce`].
    pub fn like(&mut self, item: &T) -> Result<Location> {
        self.reinforce(item, self.config.adaptation_percent)
    }

    /// Suppress by the configured adaptation percent
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::suppress`].
    pub fn dislike(&mut self, item: &T) -> Result<Location> {
        self.suppress(item, self.config.adaptation_percent)
    }

    /// Reconcile with the current item set, seeding new items with the
    /// configured sync seed.
    ///
    /// # Errors
    ///
    /// See [`TieredSelector::sync`].
    pub fn sync<I>(&mut self, current: I) -> Result<SyncReport<T>>
    where
        I: IntoIterator<Item = T>,
    {
        self.selector.sync(current, self.config.sync_seed)
    }

    /// # Errors
    ///
    /// See [`TieredSelector::reset`].
    pub fn reset(&mut self) -> Result<()> {
        self.selector.reset()
    }

    /// # Errors
    ///
    /// See [`TieredSelector::insert`].
    pub fn insert(&mut self, item: T, probability: f64) -> Result<Location> {
        self.selector.insert(item, probability)
    }

    /// # Errors
    ///
    /// See [`TieredSelector::remove`].
    pub fn remove(&mut self, item: &T) -> Result<f64> {
        self.selector.remove(item)
    }

    #[must_use]
    pub fn probability_of(&self, item: &T) -> Option<f64> {
        self.selector.probability_of(item)
    }

    #[must_use]
    pub fn top(&self) -> Option<(T, f64)> {
        self.selector.top()
    }

    #[must_use]
    pub fn items(&self) -> Vec<&T> {
        self.selector.items()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selector.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.selector.contains(item)
    }

    #[must_use]
    pub fn location(&self, item: &T) -> Option<Location> {
        self.selector.location(item)
    }

    #[must_use]
    pub fn last_selected(&self) -> Option<&T> {
        self.selector.last_selected()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn selector(&self) -> &TieredSelector<T> {
        &self.selector
    }
}

/// A [`Playlist`] behind one mutex, shareable across threads.
///
/// Every operation, including `select`, takes the lock, so a draw never sees
/// a tier mid-move.
pub struct SharedPlaylist<T, R = StdRng> {
    inner: Arc<Mutex<Playlist<T, R>>>,
}

impl<T, R> Clone for SharedPlaylist<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Eq + Hash, R: Rng> SharedPlaylist<T, R> {
    #[must_use]
    pub fn new(playlist: Playlist<T, R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(playlist)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Playlist<T, R>>> {
        self.inner.lock().map_err(|_| EngineError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the playlist
    ///
    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`] if another holder panicked.
    pub fn with<U>(&self, f: impl FnOnce(&mut Playlist<T, R>) -> U) -> Result<U> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`].
    pub fn select(&self) -> Result<Option<T>> {
        self.with(Playlist::select)
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`] or the errors of [`Playlist::reinforce`].
    pub fn reinforce(&self, item: &T, percent: f64) -> Result<Location> {
        self.lock()?.reinforce(item, percent)
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`] or the errors of [`Playlist::suppress`].
    pub fn suppress(&self, item: &T, percent: f64) -> Result<Location> {
        self.lock()?.suppress(item, percent)
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`] or the errors of [`Playlist::sync`].
    pub fn sync<I>(&self, current: I) -> Result<SyncReport<T>>
    where
        I: IntoIterator<Item = T>,
    {
        self.lock()?.sync(current)
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`] or the errors of [`Playlist::reset`].
    pub fn reset(&self) -> Result<()> {
        self.lock()?.reset()
    }

    /// # Errors
    ///
    /// [`EngineError::LockPoisoned`].
    pub fn snapshot(&self) -> Result<PlaylistState<T>> {
        self.with(|playlist| playlist.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::FeedbackStrategy;
    use crate::tiered::Tier;
    use std::thread;

    fn playlist(items: &[&'static str]) -> Playlist<&'static str> {
        Playlist::seeded(items.to_vec(), EngineConfig::default(), 99).unwrap()
    }

    #[test]
    fn test_seeded_playlists_draw_identically() {
        let mut a = playlist(&["A", "B", "C", "D"]);
        let mut b = playlist(&["A", "B", "C", "D"]);
        let draws_a: Vec<_> = (0..50).map(|_| a.select()).collect();
        let draws_b: Vec<_> = (0..50).map(|_| b.select()).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_select_records_last() {
        let mut p = playlist(&["A", "B"]);
        let item = p.select().unwrap();
        assert_eq!(p.last_selected(), Some(&item));
    }

    #[test]
    fn test_like_and_dislike_use_adaptation_percent() {
        let mut p = Playlist::seeded(vec!["A", "B", "C"], EngineConfig::flat(), 1).unwrap();
        p.like(&"A").unwrap();
        assert!((p.probability_of(&"A").unwrap() - 2.0 / 3.0).abs() < 1e-12);
        p.dislike(&"A").unwrap();
        assert!((p.probability_of(&"A").unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_config_changes_feedback() {
        let config = EngineConfig::flat().with_feedback(FeedbackStrategy::Midpoint);
        let mut p = Playlist::seeded(vec!["A", "B", "C", "D"], config, 1).unwrap();
        p.reinforce(&"A", 0.5).unwrap();
        assert!((p.probability_of(&"A").unwrap() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut p = playlist(&["A", "B", "C"]);
        p.dislike(&"A").unwrap();
        p.like(&"C").unwrap();
        p.select();

        let state = p.snapshot();
        let json = serde_json::to_string(&state).unwrap();
        let back: PlaylistState<String> = serde_json::from_str(&json).unwrap();
        let restored = Playlist::restore(back, StdRng::seed_from_u64(5)).unwrap();

        for item in ["A", "B", "C"] {
            let a = p.probability_of(&item).unwrap();
            let b = restored.probability_of(&item.to_string()).unwrap();
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(restored.location(&"A".to_string()).unwrap().tier, Tier::OCCASIONAL);
        assert_eq!(restored.last_selected().cloned(), p.last_selected().map(|s| s.to_string()));
    }

    #[test]
    fn test_state_without_last_selected_deserializes() {
        let p = playlist(&["A", "B"]);
        let mut json = serde_json::to_value(p.snapshot()).unwrap();
        json["selector"]
            .as_object_mut()
            .unwrap()
            .remove("last_selected");

        let state: PlaylistState<String> = serde_json::from_value(json).unwrap();
        assert_eq!(state.selector.last_selected, None);
        assert!(Playlist::restore(state, StdRng::seed_from_u64(1)).is_ok());
    }

    #[test]
    fn test_sync_uses_configured_seed() {
        let mut p = Playlist::seeded(vec!["A"], EngineConfig::flat(), 1).unwrap();
        let report = p.sync(vec!["A", "B"]).unwrap();
        assert_eq!(report.added, vec!["B"]);
        assert!((p.probability_of(&"B").unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            adaptation_percent: 0.0,
            ..EngineConfig::default()
        };
        assert!(Playlist::seeded(vec!["A"], config, 1).is_err());
    }

    #[test]
    fn test_shared_playlist_across_threads() {
        let items: Vec<String> = (0..12).map(|i| format!("track{i:02}")).collect();
        let shared = SharedPlaylist::new(
            Playlist::seeded(items.clone(), EngineConfig::default(), 3).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                let items = items.clone();
                thread::spawn(move || {
                    for step in 0..100 {
                        let item = &items[(worker * 7 + step) % items.len()];
                        if step % 2 == 0 {
                            shared.suppress(item, 0.3).unwrap();
                        } else {
                            shared.reinforce(item, 0.3).unwrap();
                        }
                        assert!(shared.select().unwrap().is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared
            .with(|p| {
                p.selector().check_index().unwrap();
                assert_eq!(p.len(), 12);
                let total: f64 = p
                    .items()
                    .into_iter()
                    .map(|item| p.probability_of(item).unwrap())
                    .sum();
                assert!((total - 1.0).abs() < 1e-9);
            })
            .unwrap();
    }

    #[test]
    fn test_shared_reset_and_snapshot() {
        let shared = SharedPlaylist::new(playlist(&["A", "B"]));
        shared.suppress(&"A", 0.5).unwrap();
        shared.reset().unwrap();
        let state = shared.snapshot().unwrap();
        assert_eq!(state.selector.tiers.leaves().len(), 2);
        assert!(shared.with(|p| p.location(&"A").unwrap().tier == Tier::FREQUENT).unwrap());
    }
}
