//! Weighted random selection over a tree of slots.
//!
//! A [`Distribution`] holds an ordered list of [`Slot`]s and a parallel
//! probability vector. A slot is either a leaf item or a nested distribution,
//! so one draw walks down the tree until it reaches a leaf.
//!
//! Weights start out *uniform and unmaterialised*: a freshly built
//! distribution samples by index until the first feedback or structural
//! change writes a concrete vector.

use crate::algorithm::{self, FeedbackStrategy};
use crate::error::{EngineError, Result};
use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Index rule used while weights are still uniform and unmaterialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformPick {
    /// `floor(r * n)`, every index equally likely
    #[default]
    Floor,
    /// Round-half-up of `r * (n - 1)`. Kept as a tie-break convention for
    /// playlists that relied on it; the two end indices come up half as often.
    LegacyRound,
}

impl UniformPick {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub(crate) fn index<R: Rng + ?Sized>(self, rng: &mut R, len: usize) -> usize {
        let r: f64 = rng.gen();
        let index = match self {
            Self::Floor => (r * len as f64).floor() as usize,
            Self::LegacyRound => (r * (len - 1) as f64 + 0.5).floor() as usize,
        };
        index.min(len - 1)
    }
}

/// Either a selectable item or a nested distribution.
///
/// A nested distribution with no leaves is a dead end that sampling skips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot<T> {
    Leaf(T),
    Nested(Distribution<T>),
}

impl<T> Slot<T> {
    /// Whether a draw landing here can produce an item
    #[must_use]
    pub fn is_viable(&self) -> bool {
        match self {
            Self::Leaf(_) => true,
            Self::Nested(child) => child.has_leaf(),
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Self::Leaf(item) => Some(item),
            Self::Nested(_) => None,
        }
    }

    #[must_use]
    pub fn as_nested(&self) -> Option<&Distribution<T>> {
        match self {
            Self::Leaf(_) => None,
            Self::Nested(child) => Some(child),
        }
    }
}

/// Mutable probability distribution over slots.
///
/// Invariants, checked before any change is committed:
/// - one weight per slot
/// - every weight in `[0, 1]`
/// - weights sum to 1 within [`algorithm::EPSILON`] whenever there is a slot
///
/// Deserialized distributions are validated, so malformed input is rejected
/// instead of producing a distribution that cannot be drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDistribution<T>")]
pub struct Distribution<T> {
    slots: Vec<Slot<T>>,
    /// `None` means uniform
    weights: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_selected: Option<usize>,
}

/// Wire form of a [`Distribution`] before validation
#[derive(Deserialize)]
struct RawDistribution<T> {
    slots: Vec<Slot<T>>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
    #[serde(default)]
    last_selected: Option<usize>,
}

impl<T> TryFrom<RawDistribution<T>> for Distribution<T> {
    type Error = EngineError;

    fn try_from(raw: RawDistribution<T>) -> Result<Self> {
        if let Some(weights) = &raw.weights {
            algorithm::validate_weights(weights, raw.slots.len())?;
        }
        let weights = raw.weights.filter(|_| !raw.slots.is_empty());
        let last_selected = raw.last_selected.filter(|&i| i < raw.slots.len());
        Ok(Self {
            slots: raw.slots,
            weights,
            last_selected,
        })
    }
}

impl<T> Default for Distribution<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            weights: None,
            last_selected: None,
        }
    }
}

impl<T> Distribution<T> {
    /// Distribution with no slots
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Uniform distribution over `items`
    ///
    /// # Examples
    ///
    /// ```
    /// use driftmix::distribution::Distribution;
    ///
    /// let dist = Distribution::new(vec!["a", "b", "c", "d"])?;
    /// assert_eq!(dist.weights(), vec![0.25; 4]);
    /// # Ok::<(), driftmix::error::EngineError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCollection`] if `items` is empty.
    pub fn new(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Err(EngineError::EmptyCollection(
                "a distribution needs at least one item".to_string(),
            ));
        }
        Ok(Self {
            slots: items.into_iter().map(Slot::Leaf).collect(),
            weights: None,
            last_selected: None,
        })
    }

    /// Distribution over arbitrary slots with explicit weights
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidProbabilityVector`] if `weights` does not match
    /// `slots` or is not a probability vector.
    pub fn from_slots(slots: Vec<Slot<T>>, weights: Vec<f64>) -> Result<Self> {
        algorithm::validate_weights(&weights, slots.len())?;
        let weights = (!slots.is_empty()).then_some(weights);
        Ok(Self {
            slots,
            weights,
            last_selected: None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Slot<T>> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<T>> {
        self.slots.get_mut(index)
    }

    /// Current weights, materialising the uniform vector if needed
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.weights
            .clone()
            .unwrap_or_else(|| algorithm::uniform(self.slots.len()))
    }

    #[must_use]
    pub fn weight(&self, index: usize) -> Option<f64> {
        match &self.weights {
            Some(weights) => weights.get(index).copied(),
            None => {
                #[allow(clippy::cast_precision_loss)]
                let share = 1.0 / self.slots.len() as f64;
                (index < self.slots.len()).then_some(share)
            }
        }
    }

    /// True until feedback or a structural change writes concrete weights
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.weights.is_none()
    }

    /// Slot index picked by the most recent draw at this level
    #[must_use]
    pub fn last_selected(&self) -> Option<usize> {
        self.last_selected
    }

    /// Whether any leaf exists anywhere below this distribution
    #[must_use]
    pub fn has_leaf(&self) -> bool {
        self.slots.iter().any(Slot::is_viable)
    }

    /// All leaves, depth first in slot order
    #[must_use]
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        for slot in &self.slots {
            match slot {
                Slot::Leaf(item) => out.push(item),
                Slot::Nested(child) => child.collect_leaves(out),
            }
        }
    }

    /// Replace the weight vector
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidProbabilityVector`]; the old weights stay in place.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        algorithm::validate_weights(&weights, self.slots.len())?;
        self.weights = (!self.slots.is_empty()).then_some(weights);
        Ok(())
    }

    /// Back to uniform weights at this level. Nested distributions keep theirs.
    pub fn reset(&mut self) {
        self.weights = None;
    }

    /// Make the slot at `index` more likely. See [`algorithm::reinforce`].
    ///
    /// # Errors
    ///
    /// Propagates the validation errors of [`algorithm::reinforce`].
    pub fn reinforce(&mut self, index: usize, percent: f64, strategy: FeedbackStrategy) -> Result<()> {
        let next = algorithm::reinforce(&self.weights(), index, percent, strategy)?;
        debug!("Reinforced slot {index} by {percent}: {next:?}");
        self.weights = Some(next);
        Ok(())
    }

    /// Make the slot at `index` less likely. See [`algorithm::suppress`].
    ///
    /// # Errors
    ///
    /// Propagates the validation errors of [`algorithm::suppress`].
    pub fn suppress(&mut self, index: usize, percent: f64, strategy: FeedbackStrategy) -> Result<()> {
        let next = algorithm::suppress(&self.weights(), index, percent, strategy)?;
        debug!("Suppressed slot {index} by {percent}: {next:?}");
        self.weights = Some(next);
        Ok(())
    }

    /// Append `slot` with `probability`; returns its index.
    ///
    /// # Errors
    ///
    /// [`EngineError::DegenerateOperation`] for a probability outside `[0, 1]`.
    pub fn insert(&mut self, slot: Slot<T>, probability: f64) -> Result<usize> {
        let next = algorithm::rescale_for_insert(&self.weights(), probability)?;
        self.slots.push(slot);
        self.weights = Some(next);
        debug!("Inserted slot {} with probability {probability}", self.slots.len() - 1);
        Ok(self.slots.len() - 1)
    }

    /// Remove the slot at `index`, returning it with the weight it held.
    ///
    /// Removing the last slot leaves an empty distribution.
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexOutOfRange`] for a bad index.
    pub fn remove(&mut self, index: usize) -> Result<(Slot<T>, f64)> {
        let (next, removed) = algorithm::rescale_for_remove(&self.weights(), index)?;
        let slot = self.slots.remove(index);
        self.weights = (!next.is_empty()).then_some(next);
        self.last_selected = match self.last_selected {
            Some(last) if last == index => None,
            Some(last) if last > index => Some(last - 1),
            other => other,
        };
        debug!("Removed slot {index} holding probability {removed}");
        Ok((slot, removed))
    }

    /// Check the invariants here and in every nested distribution.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidProbabilityVector`] for the first violation found.
    pub fn validate(&self) -> Result<()> {
        if let Some(weights) = &self.weights {
            algorithm::validate_weights(weights, self.slots.len())?;
        }
        self.slots
            .iter()
            .filter_map(Slot::as_nested)
            .try_for_each(Distribution::validate)
    }
}

impl<T: Clone> Distribution<T> {
    /// Draw an item, using [`UniformPick::Floor`] while weights are uniform.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        self.select_with(rng, UniformPick::Floor)
    }

    /// Draw an item, descending into nested distributions.
    ///
    /// Slots that cannot yield a leaf (empty nested distributions) are never
    /// returned: the draw is conditioned on the viable slots, which is what
    /// re-drawing until a viable slot comes up converges to. Returns `None`
    /// only when the whole tree holds no leaf.
    pub fn select_with<R: Rng + ?Sized>(&mut self, rng: &mut R, pick: UniformPick) -> Option<T> {
        let viable: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_viable())
            .map(|(i, _)| i)
            .collect();
        if viable.is_empty() {
            return None;
        }

        let index = self
            .weights
            .as_deref()
            .and_then(|weights| sample_weighted(rng, weights, &viable))
            .unwrap_or_else(|| viable[pick.index(rng, viable.len())]);
        trace!("Drew slot {index} of {}", self.slots.len());
        self.last_selected = Some(index);

        match &mut self.slots[index] {
            Slot::Leaf(item) => Some(item.clone()),
            Slot::Nested(child) => child.select_with(rng, pick),
        }
    }
}

impl<T: PartialEq> Distribution<T> {
    /// Index of the leaf equal to `item` at this level
    #[must_use]
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_leaf() == Some(item))
    }

    /// Structural equality with weights compared within `tolerance`
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .weights()
                .iter()
                .zip(other.weights())
                .all(|(a, b)| (a - b).abs() <= tolerance)
            && self.slots.iter().zip(&other.slots).all(|pair| match pair {
                (Slot::Leaf(a), Slot::Leaf(b)) => a == b,
                (Slot::Nested(a), Slot::Nested(b)) => a.approx_eq(b, tolerance),
                _ => false,
            })
    }
}

/// Inverse-CDF draw restricted to `viable` slots.
///
/// `None` if the viable slots carry no mass, so the caller falls back to
/// an index pick.
fn sample_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64], viable: &[usize]) -> Option<usize> {
    let total: f64 = viable.iter().map(|&i| weights[i]).sum();
    if total <= 0.0 {
        return None;
    }

    let r = rng.gen::<f64>() * total;
    let mut running = 0.0;
    let mut last_positive = None;
    for &i in viable {
        running += weights[i];
        if weights[i] > 0.0 {
            last_positive = Some(i);
        }
        if running > r {
            return Some(i);
        }
    }
    // floating-point slop
    last_positive
}
