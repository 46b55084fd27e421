#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Durable key-value storage and session save/load for Geocoin Carrier.
//!
//! A session occupies three keys: [`GRID_KEY`], [`PLAYER_KEY`] and
//! [`HISTORY_KEY`]. Loading never fails on bad data: a malformed or partial
//! snapshot is logged and replaced by a fresh world. Only the store's own
//! I/O failures surface as [`StorageError`], which callers treat as "skip
//! this cycle".

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use geocoin_world::{
    persistence::{self, PersistenceError, SessionSnapshot},
    GameConfig, World,
};
use thiserror::Error;

/// Key holding the grid document.
pub const GRID_KEY: &str = "geocoin.grid";
/// Key holding the player document.
pub const PLAYER_KEY: &str = "geocoin.player";
/// Key holding the movement history document.
pub const HISTORY_KEY: &str = "geocoin.history";

const SESSION_KEYS: [&str; 3] = [GRID_KEY, PLAYER_KEY, HISTORY_KEY];

/// Errors raised by durable stores and the session flow.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage i/o failed at {}: {source}", .path.display())]
    Io {
        /// Location that could not be accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A stored value is not UTF-8 text.
    #[error("stored value at {} is not utf-8: {source}", .path.display())]
    InvalidText {
        /// Location holding the value.
        path: PathBuf,
        /// Decoding failure.
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// The world could not be encoded for storage.
    #[error(transparent)]
    Encode(#[from] PersistenceError),
}

/// Minimal string key-value store used to persist sessions.
pub trait KeyValueStore {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, primarily for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let _ = self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let _ = self.entries.remove(key);
        Ok(())
    }
}

/// Store keeping one `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root`; the directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the stored files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|source| StorageError::InvalidText { path, source })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Result of attempting to restore a session.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A stored session was restored.
    Restored(World),
    /// No usable session existed, so a fresh world was built.
    Fresh(World),
}

impl LoadOutcome {
    /// Consumes the outcome, yielding the world either way.
    #[must_use]
    pub fn into_world(self) -> World {
        match self {
            Self::Restored(world) | Self::Fresh(world) => world,
        }
    }

    /// Reports whether a stored session was restored.
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        matches!(self, Self::Restored(_))
    }
}

/// Writes the world's three documents to `store`.
pub fn save_session(store: &mut dyn KeyValueStore, world: &World) -> Result<(), StorageError> {
    let snapshot = persistence::serialize(world)?;
    store.set(GRID_KEY, &snapshot.grid)?;
    store.set(PLAYER_KEY, &snapshot.player)?;
    if let Some(history) = &snapshot.history {
        store.set(HISTORY_KEY, history)?;
    }
    log::debug!("saved session ({} bytes of grid)", snapshot.grid.len());
    Ok(())
}

/// Restores the session held in `store`, or builds a fresh world.
///
/// Fresh worlds use `config`; restored worlds keep their stored grid
/// parameters and take only the origin from `config`.
pub fn load_session(
    store: &dyn KeyValueStore,
    config: &GameConfig,
) -> Result<LoadOutcome, StorageError> {
    let mut unreadable = false;
    let mut read = |key: &str| match store.get(key) {
        Err(StorageError::InvalidText { path, .. }) => {
            log::warn!("discarding unreadable session value at {}", path.display());
            unreadable = true;
            Ok(None)
        }
        other => other,
    };
    let grid = read(GRID_KEY)?;
    let player = read(PLAYER_KEY)?;
    let history = read(HISTORY_KEY)?;
    if unreadable {
        return Ok(LoadOutcome::Fresh(World::with_config(config)));
    }

    let (grid, player) = match (grid, player) {
        (Some(grid), Some(player)) => (grid, player),
        (None, None) => return Ok(LoadOutcome::Fresh(World::with_config(config))),
        _ => {
            log::warn!("discarding partial session: grid and player must be stored together");
            return Ok(LoadOutcome::Fresh(World::with_config(config)));
        }
    };

    let snapshot = SessionSnapshot {
        grid,
        player,
        history,
    };
    match persistence::deserialize(&snapshot, config.origin) {
        Ok(world) => Ok(LoadOutcome::Restored(world)),
        Err(error) => {
            log::warn!("discarding unreadable session: {error}");
            Ok(LoadOutcome::Fresh(World::with_config(config)))
        }
    }
}

/// Clears every session key, then returns a fresh world.
pub fn reset_session(
    store: &mut dyn KeyValueStore,
    config: &GameConfig,
) -> Result<World, StorageError> {
    for key in SESSION_KEYS {
        store.remove(key)?;
    }
    log::debug!("session storage cleared");
    Ok(World::with_config(config))
}
