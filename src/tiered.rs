//! Tiered reclassification on top of [`Distribution`].
//!
//! Items live in one of a fixed, ordered set of tiers (by default frequent,
//! occasional and rare). Each tier is an independent distribution nested
//! under a router distribution whose weights are the configured tier shares.
//! Feedback reweights an item inside its tier and then moves it one tier
//! toward (reinforce) or away from (suppress) the most frequent tier, seeding
//! it in the destination with the weight it held after the feedback.
//!
//! An identity → [`Location`] index tracks where every item sits so feedback
//! can address items by identity after positions shift.

use crate::algorithm::FeedbackStrategy;
use crate::config::EngineConfig;
use crate::distribution::{Distribution, Slot, UniformPick};
use crate::error::{EngineError, Result};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Position of a tier in frequency order; `Tier(0)` is the most frequent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tier(pub usize);

impl Tier {
    pub const FREQUENT: Tier = Tier(0);
    pub const OCCASIONAL: Tier = Tier(1);
    pub const RARE: Tier = Tier(2);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    fn more_frequent(self) -> Option<Tier> {
        self.0.checked_sub(1).map(Tier)
    }

    fn less_frequent(self, tier_count: usize) -> Option<Tier> {
        (self.0 + 1 < tier_count).then_some(Tier(self.0 + 1))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "frequent"),
            1 => write!(f, "occasional"),
            2 => write!(f, "rare"),
            n => write!(f, "tier {n}"),
        }
    }
}

/// Where an item currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub tier: Tier,
    pub position: usize,
}

/// Serializable form of a [`TieredSelector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredState<T> {
    /// Router distribution; every slot is a nested tier of leaves
    pub tiers: Distribution<T>,
    pub last_selected: Option<T>,
}

/// Items added and removed by [`TieredSelector::sync`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

#[derive(Debug, Clone, Copy)]
enum Feedback {
    Reinforce,
    Suppress,
}

/// Router over tiers plus the identity → location index.
#[derive(Debug, Clone)]
pub struct TieredSelector<T> {
    router: Distribution<T>,
    locations: HashMap<T, Location>,
    strategy: FeedbackStrategy,
    pick: UniformPick,
    last_selected: Option<T>,
}

impl<T: Clone + Eq + Hash> TieredSelector<T> {
    /// Every item starts in the most frequent tier with uniform weights.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptyCollection`] if `items` is empty
    /// - [`EngineError::DegenerateOperation`] if an item appears twice
    /// - any error from [`EngineConfig::validate`]
    pub fn new(items: Vec<T>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        if items.is_empty() {
            return Err(EngineError::EmptyCollection(
                "a playlist needs at least one item".to_string(),
            ));
        }
        let locations = index_tier(&items, Tier::FREQUENT, HashMap::new())?;
        let router = build_router(Distribution::new(items)?, &config.tier_shares)?;

        Ok(Self {
            router,
            locations,
            strategy: config.feedback,
            pick: config.uniform_pick,
            last_selected: None,
        })
    }

    /// Rebuild from a snapshot, taking tier shares and tuning from `config`.
    ///
    /// The location index is derived from the tiers, so it always agrees with them.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidProbabilityVector`] if any weight vector is
    ///   invalid or the tier count differs from `config`
    /// - [`EngineError::DegenerateOperation`] if a tier holds something other
    ///   than leaves, or an item appears twice
    pub fn restore(state: TieredState<T>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let TieredState {
            tiers: mut router,
            last_selected,
        } = state;
        router.validate()?;
        if router.len() != config.tier_count() {
            return Err(EngineError::InvalidProbabilityVector(format!(
                "snapshot has {} tiers, configuration expects {}",
                router.len(),
                config.tier_count()
            )));
        }
        router.set_weights(config.tier_shares.clone())?;

        let mut locations = HashMap::new();
        for (t, slot) in router.slots().iter().enumerate() {
            let tier = slot.as_nested().ok_or_else(|| {
                EngineError::DegenerateOperation(format!("tier {t} is a leaf"))
            })?;
            let items = tier
                .slots()
                .iter()
                .map(|s| {
                    s.as_leaf().cloned().ok_or_else(|| {
                        EngineError::DegenerateOperation(format!("tier {t} contains a nested slot"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            locations = index_tier(&items, Tier(t), locations)?;
        }

        let last_selected = last_selected.filter(|item| locations.contains_key(item));
        Ok(Self {
            router,
            locations,
            strategy: config.feedback,
            pick: config.uniform_pick,
            last_selected,
        })
    }

    /// Serializable copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> TieredState<T> {
        TieredState {
            tiers: self.router.clone(),
            last_selected: self.last_selected.clone(),
        }
    }

    /// Draw an item through the router. Empty tiers are skipped.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        let item = self.router.select_with(rng, self.pick)?;
        self.last_selected = Some(item.clone());
        Some(item)
    }

    /// Reinforce `item` inside its tier, then promote it one tier.
    ///
    /// Returns the item's new location.
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexOutOfRange`] for an unknown item, otherwise the
    /// errors of [`Distribution::reinforce`]. Nothing changes on error.
    pub fn reinforce(&mut self, item: &T, percent: f64) -> Result<Location> {
        self.feedback(item, percent, Feedback::Reinforce)
    }

    /// Suppress `item` inside its tier, then demote it one tier.
    ///
    /// # Errors
    ///
    /// As [`TieredSelector::reinforce`].
    pub fn suppress(&mut self, item: &T, percent: f64) -> Result<Location> {
        self.feedback(item, percent, Feedback::Suppress)
    }

    fn feedback(&mut self, item: &T, percent: f64, direction: Feedback) -> Result<Location> {
        let from = self.locate(item)?;
        let mut source = self.tier_ref(from.tier)?.clone();
        match direction {
            Feedback::Reinforce => source.reinforce(from.position, percent, self.strategy)?,
            Feedback::Suppress => source.suppress(from.position, percent, self.strategy)?,
        }

        let destination = match direction {
            Feedback::Reinforce => from.tier.more_frequent(),
            Feedback::Suppress => from.tier.less_frequent(self.tier_count()),
        };
        let Some(destination) = destination else {
            *self.tier_mut(from.tier)? = source;
            return Ok(from);
        };

        // Both tiers are rebuilt off to the side and swapped in together.
        let (slot, seed) = source.remove(from.position)?;
        let mut target = self.tier_ref(destination)?.clone();
        let position = target.insert(slot, seed)?;

        *self.tier_mut(from.tier)? = source;
        *self.tier_mut(destination)? = target;
        self.shift_after_removal(from);
        let to = Location {
            tier: destination,
            position,
        };
        self.locations.insert(item.clone(), to);
        info!(
            "Moved item from {} to {} with seed probability {seed:.4}",
            from.tier, destination
        );
        Ok(to)
    }

    /// Track a new item in the most frequent tier with `probability`.
    ///
    /// # Errors
    ///
    /// [`EngineError::DegenerateOperation`] if the item is already tracked or
    /// the probability is outside `[0, 1]`.
    pub fn insert(&mut self, item: T, probability: f64) -> Result<Location> {
        if self.locations.contains_key(&item) {
            return Err(EngineError::DegenerateOperation(
                "item is already tracked".to_string(),
            ));
        }
        let tier = self.tier_mut(Tier::FREQUENT)?;
        let position = tier.insert(Slot::Leaf(item.clone()), probability)?;
        let location = Location {
            tier: Tier::FREQUENT,
            position,
        };
        self.locations.insert(item, location);
        Ok(location)
    }

    /// Stop tracking `item`; returns the in-tier weight it held.
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexOutOfRange`] for an unknown item.
    pub fn remove(&mut self, item: &T) -> Result<f64> {
        let location = self.locate(item)?;
        let (_, weight) = self.tier_mut(location.tier)?.remove(location.position)?;
        self.locations.remove(item);
        self.shift_after_removal(location);
        if self.last_selected.as_ref() == Some(item) {
            self.last_selected = None;
        }
        Ok(weight)
    }

    /// Reconcile with the externally observed item set.
    ///
    /// Items no longer present are removed; new ones are inserted with
    /// `seed`. Applied all-or-nothing.
    ///
    /// # Errors
    ///
    /// Any error from [`TieredSelector::insert`] or [`TieredSelector::remove`];
    /// the selector is left as it was.
    pub fn sync<I>(&mut self, current: I, seed: f64) -> Result<SyncReport<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut seen = HashSet::new();
        let current: Vec<T> = current
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();

        let removed: Vec<T> = self
            .items()
            .into_iter()
            .filter(|item| !seen.contains(*item))
            .cloned()
            .collect();

        let mut next = self.clone();
        for item in &removed {
            next.remove(item)?;
        }
        let mut added = Vec::new();
        for item in current {
            if !next.contains(&item) {
                next.insert(item.clone(), seed)?;
                added.push(item);
            }
        }

        *self = next;
        info!("Synced items: {} added, {} removed", added.len(), removed.len());
        Ok(SyncReport { added, removed })
    }

    /// Move every item back to the most frequent tier with uniform weights.
    ///
    /// # Errors
    ///
    /// Errors from rebuilding the router or the location index leave the
    /// selector unchanged.
    pub fn reset(&mut self) -> Result<()> {
        let items: Vec<T> = self.items().into_iter().cloned().collect();
        let frequent = match items.is_empty() {
            true => Distribution::empty(),
            false => Distribution::new(items.clone())?,
        };
        let router = build_router(frequent, &self.router.weights())?;
        let locations = index_tier(&items, Tier::FREQUENT, HashMap::new())?;

        self.router = router;
        self.locations = locations;
        debug!("Reset {} items to the {} tier", items.len(), Tier::FREQUENT);
        Ok(())
    }

    /// Tracked items in tier order
    #[must_use]
    pub fn items(&self) -> Vec<&T> {
        self.router.leaves()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.locations.contains_key(item)
    }

    #[must_use]
    pub fn location(&self, item: &T) -> Option<Location> {
        self.locations.get(item).copied()
    }

    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.router.len()
    }

    #[must_use]
    pub fn tier(&self, tier: Tier) -> Option<&Distribution<T>> {
        self.router.slot(tier.index()).and_then(Slot::as_nested)
    }

    /// Router shares, most frequent tier first
    #[must_use]
    pub fn tier_shares(&self) -> Vec<f64> {
        self.router.weights()
    }

    #[must_use]
    pub fn strategy(&self) -> FeedbackStrategy {
        self.strategy
    }

    #[must_use]
    pub fn last_selected(&self) -> Option<&T> {
        self.last_selected.as_ref()
    }

    /// Chance that the next draw returns `item`.
    ///
    /// Tier shares are renormalised over the tiers that hold items, matching
    /// how [`TieredSelector::select`] skips empty tiers.
    #[must_use]
    pub fn probability_of(&self, item: &T) -> Option<f64> {
        let location = self.location(item)?;
        let in_tier = self.tier(location.tier)?.weight(location.position)?;
        let shares = self.router.weights();
        let live: Vec<usize> = (0..self.tier_count())
            .filter(|&t| self.tier(Tier(t)).is_some_and(Distribution::has_leaf))
            .collect();
        let live_mass: f64 = live.iter().map(|&t| shares[t]).sum();

        #[allow(clippy::cast_precision_loss)]
        let tier_chance = match live_mass > 0.0 {
            true => shares[location.tier.index()] / live_mass,
            false => 1.0 / live.len() as f64,
        };
        Some(tier_chance * in_tier)
    }

    /// Item with the greatest chance of being drawn next, with that chance
    #[must_use]
    pub fn top(&self) -> Option<(T, f64)> {
        self.items()
            .into_iter()
            .filter_map(|item| Some((item, self.probability_of(item)?)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(item, p)| (item.clone(), p))
    }

    /// Check that every indexed location points at the item it claims to.
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexOutOfRange`] naming the first mismatch.
    pub fn check_index(&self) -> Result<()> {
        let leaves = self.items().len();
        if leaves != self.locations.len() {
            return Err(EngineError::IndexOutOfRange(format!(
                "{} indexed items but {leaves} leaves",
                self.locations.len()
            )));
        }
        for (item, location) in &self.locations {
            let found = self
                .tier(location.tier)
                .and_then(|tier| tier.slot(location.position))
                .and_then(Slot::as_leaf);
            if found != Some(item) {
                return Err(EngineError::IndexOutOfRange(format!(
                    "stale location {} #{}",
                    location.tier, location.position
                )));
            }
        }
        Ok(())
    }

    fn locate(&self, item: &T) -> Result<Location> {
        self.location(item)
            .ok_or_else(|| EngineError::IndexOutOfRange("item is not tracked".to_string()))
    }

    fn tier_ref(&self, tier: Tier) -> Result<&Distribution<T>> {
        self.tier(tier)
            .ok_or_else(|| EngineError::IndexOutOfRange(format!("no {tier} tier")))
    }

    fn tier_mut(&mut self, tier: Tier) -> Result<&mut Distribution<T>> {
        match self.router.slot_mut(tier.index()) {
            Some(Slot::Nested(distribution)) => Ok(distribution),
            _ => Err(EngineError::IndexOutOfRange(format!("no {tier} tier"))),
        }
    }

    /// Items behind a removed slot move up one position.
    fn shift_after_removal(&mut self, removed: Location) {
        for location in self.locations.values_mut() {
            if location.tier == removed.tier && location.position > removed.position {
                location.position -= 1;
            }
        }
    }
}

fn build_router<T>(frequent: Distribution<T>, shares: &[f64]) -> Result<Distribution<T>> {
    let slots = std::iter::once(frequent)
        .chain((1..shares.len()).map(|_| Distribution::empty()))
        .map(Slot::Nested)
        .collect();
    Distribution::from_slots(slots, shares.to_vec())
}

fn index_tier<T: Clone + Eq + Hash>(
    items: &[T],
    tier: Tier,
    mut locations: HashMap<T, Location>,
) -> Result<HashMap<T, Location>> {
    for (position, item) in items.iter().enumerate() {
        if locations
            .insert(item.clone(), Location { tier, position })
            .is_some()
        {
            return Err(EngineError::DegenerateOperation(
                "the same item is listed twice".to_string(),
            ));
        }
    }
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn selector(items: &[&'static str]) -> TieredSelector<&'static str> {
        TieredSelector::new(items.to_vec(), &EngineConfig::default()).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_new_starts_in_frequent_tier() {
        let s = selector(&["A", "B", "C"]);
        assert_eq!(s.tier_count(), 3);
        assert_eq!(s.tier(Tier::FREQUENT).unwrap().len(), 3);
        assert!(s.tier(Tier::OCCASIONAL).unwrap().is_empty());
        assert!(s.tier(Tier::RARE).unwrap().is_empty());
        assert_eq!(
            s.location(&"B"),
            Some(Location { tier: Tier::FREQUENT, position: 1 })
        );
        s.check_index().unwrap();
    }

    #[test]
    fn test_new_rejects_empty_and_duplicates() {
        let config = EngineConfig::default();
        assert!(matches!(
            TieredSelector::<&str>::new(Vec::new(), &config),
            Err(EngineError::EmptyCollection(_))
        ));
        assert!(matches!(
            TieredSelector::new(vec!["A", "A"], &config),
            Err(EngineError::DegenerateOperation(_))
        ));
    }

    #[test]
    fn test_suppress_full_moves_to_occasional() {
        let mut s = selector(&["A", "B"]);
        let moved = s.suppress(&"A", 1.0).unwrap();

        assert_eq!(moved, Location { tier: Tier::OCCASIONAL, position: 0 });
        assert_eq!(s.tier(Tier::FREQUENT).unwrap().weights(), vec![1.0]);
        assert_eq!(s.tier(Tier::OCCASIONAL).unwrap().weights(), vec![1.0]);
        assert_eq!(
            s.location(&"B"),
            Some(Location { tier: Tier::FREQUENT, position: 0 })
        );
        s.check_index().unwrap();
    }

    #[test]
    fn test_reinforce_in_frequent_stays() {
        let mut s = selector(&["A", "B", "C"]);
        let location = s.reinforce(&"A", 0.5).unwrap();
        assert_eq!(location.tier, Tier::FREQUENT);
        let w = s.tier(Tier::FREQUENT).unwrap().weights();
        assert_close(w[0], 2.0 / 3.0);
        assert_close(w[1], 1.0 / 6.0);
        assert_close(w[2], 1.0 / 6.0);
    }

    #[test]
    fn test_suppress_in_rare_stays() {
        let mut s = selector(&["A", "B", "C"]);
        s.suppress(&"A", 0.5).unwrap();
        s.suppress(&"A", 0.5).unwrap();
        assert_eq!(s.location(&"A").unwrap().tier, Tier::RARE);
        let location = s.suppress(&"A", 0.5).unwrap();
        assert_eq!(location.tier, Tier::RARE);
        s.check_index().unwrap();
    }

    #[test]
    fn test_reinforce_promotes_one_tier() {
        let mut s = selector(&["A", "B", "C"]);
        s.suppress(&"A", 0.5).unwrap();
        s.suppress(&"B", 0.5).unwrap();
        assert_eq!(s.tier(Tier::OCCASIONAL).unwrap().len(), 2);

        let location = s.reinforce(&"B", 0.5).unwrap();
        assert_eq!(location.tier, Tier::FREQUENT);
        assert_eq!(s.location(&"A").unwrap().tier, Tier::OCCASIONAL);
        s.check_index().unwrap();
    }

    #[test]
    fn test_removal_reindexes_shifted_items() {
        let mut s = selector(&["A", "B", "C", "D"]);
        s.suppress(&"B", 0.5).unwrap();
        assert_eq!(s.location(&"C").unwrap().position, 1);
        assert_eq!(s.location(&"D").unwrap().position, 2);
        s.check_index().unwrap();
    }

    #[test]
    fn test_feedback_on_unknown_item() {
        let mut s = selector(&["A"]);
        assert!(matches!(
            s.reinforce(&"Z", 0.5),
            Err(EngineError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_failed_feedback_leaves_state() {
        let mut s = selector(&["A", "B"]);
        let before = s.snapshot();
        assert!(s.reinforce(&"A", 1.0).is_err());
        assert!(s.suppress(&"A", 0.0).is_err());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_select_never_empty_while_items_exist() {
        let mut s = selector(&["A", "B", "C"]);
        let mut rng = StdRng::seed_from_u64(11);
        s.suppress(&"A", 1.0).unwrap();
        s.suppress(&"A", 1.0).unwrap();
        for _ in 0..300 {
            let item = s.select(&mut rng).unwrap();
            assert_eq!(s.last_selected(), Some(&item));
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let mut s = selector(&["A", "B", "C", "D"]);
        s.suppress(&"A", 0.5).unwrap();
        s.suppress(&"B", 0.5).unwrap();
        s.suppress(&"B", 0.5).unwrap();
        let total: f64 = s
            .items()
            .into_iter()
            .map(|item| s.probability_of(item).unwrap())
            .sum();
        assert_close(total, 1.0);
        assert_eq!(s.probability_of(&"Z"), None);
    }

    #[test]
    fn test_top_prefers_reinforced_item() {
        let mut s = selector(&["A", "B", "C"]);
        s.reinforce(&"C", 0.5).unwrap();
        let (item, p) = s.top().unwrap();
        assert_eq!(item, "C");
        assert_close(p, 2.0 / 3.0);
    }

    #[test]
    fn test_sync_adds_and_removes() {
        let mut s = selector(&["A", "B", "C"]);
        s.suppress(&"C", 0.5).unwrap();

        let report = s.sync(vec!["A", "C", "D", "D"], 0.05).unwrap();
        assert_eq!(report.added, vec!["D"]);
        assert_eq!(report.removed, vec!["B"]);
        assert!(!s.contains(&"B"));
        assert_eq!(s.location(&"D").unwrap().tier, Tier::FREQUENT);
        assert_close(s.tier(Tier::FREQUENT).unwrap().weight(1).unwrap(), 0.05);
        s.check_index().unwrap();
    }

    #[test]
    fn test_sync_to_empty_leaves_nothing_to_draw() {
        let mut s = selector(&["A", "B"]);
        let report = s.sync(Vec::new(), 0.05).unwrap();
        assert_eq!(report.removed.len(), 2);
        assert!(s.is_empty());
        assert_eq!(s.select(&mut StdRng::seed_from_u64(1)), None);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut s = selector(&["A"]);
        assert!(matches!(
            s.insert("A", 0.1),
            Err(EngineError::DegenerateOperation(_))
        ));
    }

    #[test]
    fn test_remove_returns_weight() {
        let mut s = selector(&["A", "B"]);
        assert_close(s.remove(&"A").unwrap(), 0.5);
        assert!(s.remove(&"A").is_err());
        s.check_index().unwrap();
    }

    #[test]
    fn test_reset_returns_all_to_frequent() {
        let mut s = selector(&["A", "B", "C"]);
        s.suppress(&"A", 0.5).unwrap();
        s.suppress(&"B", 0.9).unwrap();
        s.suppress(&"B", 0.9).unwrap();

        s.reset().unwrap();
        assert_eq!(s.tier(Tier::FREQUENT).unwrap().len(), 3);
        assert!(s.tier(Tier::FREQUENT).unwrap().is_uniform());
        assert_eq!(s.tier_shares(), vec![0.78, 0.14, 0.08]);
        s.check_index().unwrap();

        let once = s.snapshot();
        s.reset().unwrap();
        assert_eq!(s.snapshot(), once);
    }

    #[test]
    fn test_reset_after_sync_to_empty() {
        let mut s = selector(&["A", "B"]);
        s.suppress(&"A", 0.5).unwrap();
        s.sync(Vec::new(), 0.05).unwrap();

        s.reset().unwrap();
        assert!(s.is_empty());
        assert_eq!(s.tier_count(), 3);
        assert_eq!(s.tier_shares(), vec![0.78, 0.14, 0.08]);
        assert_eq!(s.select(&mut StdRng::seed_from_u64(1)), None);

        s.insert("C", 0.3).unwrap();
        s.reset().unwrap();
        assert_eq!(s.location(&"C").unwrap().tier, Tier::FREQUENT);
        s.check_index().unwrap();
    }

    #[test]
    fn test_restore_round_trip() {
        let mut s = selector(&["A", "B", "C", "D"]);
        s.suppress(&"A", 0.7).unwrap();
        s.reinforce(&"C", 0.2).unwrap();
        s.suppress(&"D", 1.0).unwrap();
        s.suppress(&"D", 1.0).unwrap();

        let restored = TieredSelector::restore(s.snapshot(), &EngineConfig::default()).unwrap();
        assert!(restored.snapshot().tiers.approx_eq(&s.snapshot().tiers, 1e-12));
        for item in ["A", "B", "C", "D"] {
            assert_eq!(restored.location(&item), s.location(&item));
        }
    }

    #[test]
    fn test_restore_rejects_malformed_state() {
        let config = EngineConfig::default();
        let s = selector(&["A", "B"]);

        let flat = TieredSelector::restore(s.snapshot(), &EngineConfig::flat());
        assert!(matches!(flat, Err(EngineError::InvalidProbabilityVector(_))));

        let duplicated = Distribution::from_slots(
            vec![
                Slot::Nested(Distribution::new(vec!["A"]).unwrap()),
                Slot::Nested(Distribution::new(vec!["A"]).unwrap()),
                Slot::Nested(Distribution::empty()),
            ],
            config.tier_shares.clone(),
        )
        .unwrap();
        let state = TieredState { tiers: duplicated, last_selected: None };
        assert!(matches!(
            TieredSelector::restore(state, &config),
            Err(EngineError::DegenerateOperation(_))
        ));

        let leaf_tier = Distribution::from_slots(
            vec![Slot::Leaf("A"), Slot::Nested(Distribution::empty()), Slot::Nested(Distribution::empty())],
            config.tier_shares.clone(),
        )
        .unwrap();
        let state = TieredState { tiers: leaf_tier, last_selected: None };
        assert!(TieredSelector::restore(state, &config).is_err());
    }

    #[test]
    fn test_flat_config_never_moves() {
        let mut s = TieredSelector::new(vec!["A", "B", "C"], &EngineConfig::flat()).unwrap();
        assert_eq!(s.suppress(&"A", 1.0).unwrap().tier, Tier::FREQUENT);
        assert_eq!(s.reinforce(&"B", 0.5).unwrap().tier, Tier::FREQUENT);
        assert_eq!(s.tier_count(), 1);
        s.check_index().unwrap();
    }

    #[test]
    fn test_many_moves_keep_index_consistent() {
        let items = ["A", "B", "C", "D", "E", "F"];
        let mut s = selector(&items);
        let mut rng = StdRng::seed_from_u64(3);
        for step in 0..400 {
            let item = items[rng.gen_range(0..items.len())];
            match step % 3 {
                0 => s.reinforce(&item, 0.4).map(|_| ()),
                1 => s.suppress(&item, 0.6).map(|_| ()),
                _ => s.select(&mut rng)
                    .map(|_| ())
                    .ok_or_else(|| EngineError::EmptyCollection("drained".to_string())),
            }
            .unwrap();
            s.check_index().unwrap();
            s.snapshot().tiers.validate().unwrap();
        }
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::FREQUENT.to_string(), "frequent");
        assert_eq!(Tier::RARE.to_string(), "rare");
        assert_eq!(Tier(5).to_string(), "tier 5");
    }
}
