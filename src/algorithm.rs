//! Probability-vector algorithms for feedback and structural changes.
//!
//! Everything here is a pure function over `&[f64]`: it returns a new,
//! validated vector or an error, and never touches the caller's state.
//! [`crate::distribution::Distribution`] commits the result only on success.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Tolerance for the sum-to-one and `[0, 1]` checks.
///
/// Repeated rescaling cannot keep the sum at exactly `1.0`, so every check
/// in the crate compares against this instead.
pub const EPSILON: f64 = 1e-9;

/// How feedback sizes the step applied to the targeted weight.
///
/// # Variants
///
/// - `Proportional`: reinforce adds `percent * (1 - w)`, suppress removes
///   `percent * w`.
/// - `Midpoint`: both directions move by `percent * min(w, 1 - w)`, so the side
///   of 0.5 the weight sits on decides whether the percent scales the distance
///   to 1 or the weight itself. A weight of exactly 0 or 1 never moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStrategy {
    #[default]
    Proportional,
    Midpoint,
}

impl FeedbackStrategy {
    #[inline]
    fn reinforce_step(self, weight: f64, percent: f64) -> f64 {
        match self {
            Self::Proportional => percent * (1.0 - weight),
            Self::Midpoint => percent * weight.min(1.0 - weight),
        }
    }

    #[inline]
    fn suppress_step(self, weight: f64, percent: f64) -> f64 {
        match self {
            Self::Proportional => percent * weight,
            Self::Midpoint => percent * weight.min(1.0 - weight),
        }
    }
}

/// Uniform vector of `len` weights.
#[must_use]
pub fn uniform(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        n => {
            #[allow(clippy::cast_precision_loss)]
            let share = 1.0 / n as f64;
            vec![share; n]
        }
    }
}

/// Checks invariants I1-I3 for a vector that should describe `expected_len` slots.
///
/// An empty vector is valid only when `expected_len` is zero.
///
/// # Errors
///
/// Returns [`EngineError::InvalidProbabilityVector`] on a length mismatch,
/// a non-finite weight, a weight outside `[0, 1]` or a sum away from 1.
pub fn validate_weights(weights: &[f64], expected_len: usize) -> Result<()> {
    if weights.len() != expected_len {
        return Err(EngineError::InvalidProbabilityVector(format!(
            "expected {expected_len} weights, got {}",
            weights.len()
        )));
    }
    if weights.is_empty() {
        return Ok(());
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < -EPSILON || **w > 1.0 + EPSILON)
    {
        return Err(EngineError::InvalidProbabilityVector(format!(
            "weight {w} at index {i} is outside [0, 1]"
        )));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > EPSILON {
        return Err(EngineError::InvalidProbabilityVector(format!(
            "weights sum to {sum}, not 1"
        )));
    }
    Ok(())
}

/// Raises the weight at `index` and shrinks the others proportionally.
///
/// `percent` must lie in `(0, 1)`. A single-slot vector is returned unchanged.
///
/// # Examples
///
/// ```
/// use driftmix::algorithm::{reinforce, FeedbackStrategy};
///
/// let third = 1.0 / 3.0;
/// let next = reinforce(&[third, third, third], 0, 0.5, FeedbackStrategy::Proportional)?;
/// assert!((next[0] - 2.0 / 3.0).abs() < 1e-12);
/// assert!((next[1] - 1.0 / 6.0).abs() < 1e-12);
/// # Ok::<(), driftmix::error::EngineError>(())
/// ```
///
/// # Errors
///
/// [`EngineError::DegenerateOperation`] for a percent outside `(0, 1)`,
/// [`EngineError::IndexOutOfRange`] for a bad index, and
/// [`EngineError::InvalidProbabilityVector`] if the result fails validation.
pub fn reinforce(
    weights: &[f64],
    index: usize,
    percent: f64,
    strategy: FeedbackStrategy,
) -> Result<Vec<f64>> {
    if !(percent > 0.0 && percent < 1.0) {
        return Err(EngineError::DegenerateOperation(format!(
            "reinforce percent {percent} is not within (0, 1)"
        )));
    }
    let current = weight_at(weights, index)?;
    if weights.len() == 1 {
        return Ok(weights.to_vec());
    }
    let target = (current + strategy.reinforce_step(current, percent)).min(1.0);
    redistribute(weights, index, target)
}

/// Lowers the weight at `index` and hands the freed mass to the others.
///
/// `percent` must lie in `(0, 1]`; with `1.0` and the proportional strategy
/// the slot drops to zero. A single-slot vector is returned unchanged.
///
/// # Errors
///
/// Same as [`reinforce`], except the percent bound is `(0, 1]`.
pub fn suppress(
    weights: &[f64],
    index: usize,
    percent: f64,
    strategy: FeedbackStrategy,
) -> Result<Vec<f64>> {
    if !(percent > 0.0 && percent <= 1.0) {
        return Err(EngineError::DegenerateOperation(format!(
            "suppress percent {percent} is not within (0, 1]"
        )));
    }
    let current = weight_at(weights, index)?;
    if weights.len() == 1 {
        return Ok(weights.to_vec());
    }
    let target = (current - strategy.suppress_step(current, percent)).max(0.0);
    redistribute(weights, index, target)
}

/// Vector after appending a slot with `probability`.
///
/// The new slot keeps exactly `probability`; existing weights are scaled by
/// `1 - probability` and the last existing slot absorbs the residual.
/// A probability of exactly `1.0` means an even share, `1 / (len + 1)`.
/// Appending to an empty vector always yields `[1.0]`.
///
/// # Errors
///
/// [`EngineError::DegenerateOperation`] if `probability` is outside `[0, 1]`.
pub fn rescale_for_insert(weights: &[f64], probability: f64) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(EngineError::DegenerateOperation(format!(
            "insert probability {probability} is not within [0, 1]"
        )));
    }
    if weights.is_empty() {
        return Ok(vec![1.0]);
    }

    let len = weights.len() + 1;
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    let share = if probability == 1.0 {
        1.0 / len as f64
    } else {
        probability
    };

    let mut next: Vec<f64> = weights.iter().map(|w| w * (1.0 - share)).collect();
    next.push(share);
    absorb_residual(&mut next, len - 2);
    validate_weights(&next, len)?;
    Ok(next)
}

/// Vector after dropping the slot at `index`, plus the weight it held.
///
/// Remaining weights are scaled by `1 / (1 - removed)` and the last remaining
/// slot absorbs the residual. If the remaining slots carried no mass at all
/// they become uniform. Removing the only slot yields an empty vector.
///
/// # Errors
///
/// [`EngineError::IndexOutOfRange`] for a bad index.
pub fn rescale_for_remove(weights: &[f64], index: usize) -> Result<(Vec<f64>, f64)> {
    let removed = weight_at(weights, index)?;
    if weights.len() == 1 {
        return Ok((Vec::new(), removed));
    }

    let remaining: Vec<f64> = weights
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, w)| *w)
        .collect();
    let mass: f64 = remaining.iter().sum();

    let mut next = match mass > 0.0 {
        true => remaining.iter().map(|w| w / mass).collect::<Vec<_>>(),
        false => uniform(remaining.len()),
    };
    let last = next.len() - 1;
    absorb_residual(&mut next, last);
    validate_weights(&next, weights.len() - 1)?;
    Ok((next, removed))
}

fn weight_at(weights: &[f64], index: usize) -> Result<f64> {
    weights.get(index).copied().ok_or_else(|| {
        EngineError::IndexOutOfRange(format!(
            "index {index} for {} slots",
            weights.len()
        ))
    })
}

/// Sets `index` to `target` and scales every other weight by its share of the
/// remaining mass. Requires at least two slots.
fn redistribute(previous: &[f64], index: usize, target: f64) -> Result<Vec<f64>> {
    let len = previous.len();
    let others: f64 = previous
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, w)| *w)
        .sum();
    let leftover = 1.0 - target;

    #[allow(clippy::cast_precision_loss)]
    let next_other = |w: f64| match others > 0.0 {
        true => w * leftover / others,
        false => leftover / (len - 1) as f64,
    };

    let mut next: Vec<f64> = previous
        .iter()
        .enumerate()
        .map(|(i, &w)| if i == index { target } else { next_other(w) })
        .collect();

    // The last "other" slot takes whatever drift the scaling left behind.
    let absorber = if index == len - 1 { len - 2 } else { len - 1 };
    absorb_residual(&mut next, absorber);
    validate_weights(&next, len)?;
    Ok(next)
}

/// Residual absorption: `weights[absorber] = 1 - sum(others)`.
///
/// Values within [`EPSILON`] of a bound are clamped onto it; anything further
/// out is left for [`validate_weights`] to reject.
fn absorb_residual(weights: &mut [f64], absorber: usize) {
    weights[absorber] = 0.0;
    let residual = 1.0 - weights.iter().sum::<f64>();
    weights[absorber] = match residual {
        r if (-EPSILON..0.0).contains(&r) => 0.0,
        r if r > 1.0 && r <= 1.0 + EPSILON => 1.0,
        r => r,
    };
}

/// Descriptive statistics over probability vectors
pub mod statistics {
    /// Summary of one distribution level
    #[derive(Debug, Clone, PartialEq)]
    pub struct WeightStatistics {
        pub mean: f64,
        pub variance: f64,
        pub std_deviation: f64,
        pub min: f64,
        pub max: f64,
        /// Shannon entropy in bits; `log2(count)` for a uniform vector
        pub entropy: f64,
        pub count: usize,
    }

    /// Summarise a weight vector. An empty vector yields all zeros.
    #[must_use]
    pub fn analyze_weights(weights: &[f64]) -> WeightStatistics {
        if weights.is_empty() {
            return WeightStatistics {
                mean: 0.0,
                variance: 0.0,
                std_deviation: 0.0,
                min: 0.0,
                max: 0.0,
                entropy: 0.0,
                count: 0,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let n = weights.len() as f64;
        let mean = weights.iter().sum::<f64>() / n;
        let variance = weights.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / n;
        let entropy = -weights
            .iter()
            .filter(|w| **w > 0.0)
            .map(|w| w * w.log2())
            .sum::<f64>();

        WeightStatistics {
            mean,
            variance,
            std_deviation: variance.sqrt(),
            min: weights.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            max: weights.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
            entropy,
            count: weights.len(),
        }
    }
}
