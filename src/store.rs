//! # State Store
//!
//! JSON persistence for a command-line session: the playlist snapshot plus
//! its play history. Writes go to a temporary file in the target directory
//! and are renamed over the old state, so an interrupted write never leaves
//! a truncated file behind.

use crate::engine::PlaylistState;
use crate::history::PlayHistory;
use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Everything the command-line front end keeps between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub playlist: PlaylistState<String>,
    #[serde(default)]
    pub history: PlayHistory<String>,
}

impl Session {
    #[must_use]
    pub fn new(playlist: PlaylistState<String>) -> Self {
        Self {
            playlist,
            history: PlayHistory::default(),
        }
    }
}

/// Read a JSON value from `path`; `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!("No state file at {}", path.display());
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("State file {} is not valid", path.display()))?;
    Ok(Some(value))
}

/// Atomically replace `path` with the JSON form of `value`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Fails if the directory cannot be created or the file cannot be written
/// and renamed into place.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut file, value).context("Failed to serialize state")?;
    file.write_all(b"\n")?;
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write state file {}", path.display()))?;

    debug!("Saved state to {}", path.display());
    Ok(())
}

/// # Errors
///
/// See [`load`].
pub fn load_session(path: &Path) -> Result<Option<Session>> {
    load(path)
}

/// # Errors
///
/// See [`save`].
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    save(path, session)
}
