//! Adaptive weighted-random playlist engine.
//!
//! A playlist draws items at random, learns from explicit feedback, and
//! reorganizes items into frequency tiers so that liked items come up more
//! often and disliked ones drift toward the back without ever disappearing.
//!
//! Core modules:
//! - [`algorithm`] - Reinforce/suppress and insert/remove rescaling on weight vectors
//! - [`distribution`] - Recursive probability distribution with weighted selection
//! - [`tiered`] - Tier router and identity index on top of [`distribution`]
//! - [`engine`] - The [`engine::Playlist`] aggregate and its thread-safe wrapper
//!
//! ### Supporting Modules
//!
//! - [`config`] - Engine tuning and data directory management
//! - [`history`] - Back/forward play history
//! - [`store`] - Atomic JSON persistence of a session
//! - [`error`] - Error type shared by the engine modules
//!
//! ## Quick Start Example
//!
//! ```
//! use driftmix::config::EngineConfig;
//! use driftmix::engine::Playlist;
//! use driftmix::tiered::Tier;
//!
//! let tracks = vec!["intro.flac", "single.flac", "b-side.flac", "outro.flac"];
//! let mut playlist = Playlist::seeded(tracks, EngineConfig::default(), 7)?;
//!
//! let track = playlist.select().expect("playlist is not empty");
//! println!("Now playing {track}");
//!
//! // Disliking a track moves it to the occasional tier
//! let location = playlist.dislike(&"b-side.flac")?;
//! assert_eq!(location.tier, Tier::OCCASIONAL);
//!
//! // Learned weights survive new tracks showing up
//! let report = playlist.sync(vec!["intro.flac", "single.flac", "b-side.flac", "outro.flac", "bonus.flac"])?;
//! assert_eq!(report.added, vec!["bonus.flac"]);
//! # Ok::<(), driftmix::error::EngineError>(())
//! ```
//!
//! ## Algorithm Details
//!
//! ### Feedback
//! - Reinforcing moves `percent` of the other items' mass onto the item
//! - Suppressing moves `percent` of the item's own mass onto the others
//! - The other items keep their relative proportions
//! - A midpoint rule is available that steps symmetrically in both directions
//!
//! ### Tiers
//! - Default shares are 78% frequent, 14% occasional and 8% rare
//! - Each feedback call moves the item one tier up or down, seeding it in
//!   the destination with the weight it held after the feedback
//! - Empty tiers are skipped when drawing, so a draw always succeeds while
//!   any item is tracked
//!
//! ## Logging
//!
//! Uses the `log` crate. The binary initializes `env_logger`, so set
//! `RUST_LOG=driftmix=debug` to see tier moves and syncs.

pub mod algorithm;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod history;
pub mod store;
pub mod tiered;
