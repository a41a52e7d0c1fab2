//! Error types for the selection engine

use thiserror::Error;

/// Engine errors
///
/// Every mutating operation validates its candidate state before committing,
/// so returning one of these always leaves the previous state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Length mismatch, a weight outside `[0, 1]`, or a sum away from 1
    #[error("Invalid probability vector: {0}")]
    InvalidProbabilityVector(String),

    /// Index or identity the engine does not track
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Operation whose arguments make no sense (percent out of bounds, duplicates)
    #[error("Degenerate operation: {0}")]
    DegenerateOperation(String),

    /// Construction with no items, or a tree with no leaves left
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// A thread panicked while holding the playlist lock
    #[error("Playlist lock poisoned")]
    LockPoisoned,
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
