//! # Configuration Module
//!
//! Engine tuning ([`EngineConfig`]) and the on-disk locations the command-line
//! front end uses ([`RuntimeConfig`]).
//!
//! ## Data Storage
//!
//! Playlist state lives in the platform-standard data directory:
//! - Linux: `~/.local/share/driftmix/`
//! - macOS: `~/Library/Application Support/driftmix/`
//! - Windows: `%APPDATA%\driftmix\`

use crate::algorithm::{self, FeedbackStrategy};
use crate::distribution::UniformPick;
use crate::error::EngineError;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tier shares used by the default three-tier layout (frequent, occasional, rare).
pub const DEFAULT_TIER_SHARES: [f64; 3] = [0.78, 0.14, 0.08];

/// Tuning for a [`crate::engine::Playlist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Router weights, most frequent tier first. One entry means a flat playlist.
    pub tier_shares: Vec<f64>,
    /// Step rule for reinforce/suppress
    pub feedback: FeedbackStrategy,
    /// Percent used by feedback calls that don't pass their own
    pub adaptation_percent: f64,
    /// Probability given to items that appear during a sync
    pub sync_seed: f64,
    /// Index rule while a level is still uniform
    pub uniform_pick: UniformPick,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier_shares: DEFAULT_TIER_SHARES.to_vec(),
            feedback: FeedbackStrategy::Proportional,
            adaptation_percent: 0.5,
            sync_seed: 0.05,
            uniform_pick: UniformPick::Floor,
        }
    }
}

impl EngineConfig {
    /// Single-tier configuration: feedback reweights but never moves items.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            tier_shares: vec![1.0],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: FeedbackStrategy) -> Self {
        self.feedback = feedback;
        self
    }

    #[must_use]
    pub fn with_tier_shares(mut self, tier_shares: Vec<f64>) -> Self {
        self.tier_shares = tier_shares;
        self
    }

    /// Number of tiers this configuration describes
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tier_shares.len()
    }

    /// # Errors
    ///
    /// - [`EngineError::InvalidProbabilityVector`] if the tier shares are empty
    ///   or not a probability vector
    /// - [`EngineError::DegenerateOperation`] if the adaptation percent is not
    ///   usable by both reinforce and suppress, or the sync seed is outside `[0, 1]`
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.tier_shares.is_empty() {
            return Err(EngineError::InvalidProbabilityVector(
                "at least one tier share is required".to_string(),
            ));
        }
        algorithm::validate_weights(&self.tier_shares, self.tier_shares.len())?;
        if !(self.adaptation_percent > 0.0 && self.adaptation_percent < 1.0) {
            return Err(EngineError::DegenerateOperation(format!(
                "adaptation percent {} is not within (0, 1)",
                self.adaptation_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.sync_seed) {
            return Err(EngineError::DegenerateOperation(format!(
                "sync seed {} is not within [0, 1]",
                self.sync_seed
            )));
        }
        Ok(())
    }
}

/// Returns the platform-appropriate data directory for driftmix, creating it
/// if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the
/// `driftmix` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join("driftmix");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Default location of the playlist state file.
///
/// ```no_run
/// let path = driftmix::config::get_state_path()?;
/// println!("State location: {}", path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_state_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("state.json"))
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the playlist state file
    pub state_path: PathBuf,
}

impl RuntimeConfig {
    /// Runtime configuration using the default state path
    ///
    /// # Errors
    ///
    /// See [`get_state_path`].
    pub fn new() -> Result<Self> {
        Ok(Self {
            state_path: get_state_path()?,
        })
    }

    /// Runtime configuration with an explicit state path, made absolute
    ///
    /// # Errors
    ///
    /// Fails if the current directory cannot be read to absolutize a relative path.
    pub fn with_state_path(state_path: &Path) -> Result<Self> {
        let absolute = state_path
            .absolutize()
            .with_context(|| format!("Invalid state path {}", state_path.display()))?;
        Ok(Self {
            state_path: absolute.into_owned(),
        })
    }
}
