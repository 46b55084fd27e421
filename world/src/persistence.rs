//! Snapshot codec for the grid, the player, and the movement trail.
//!
//! A session is stored as three independent JSON documents so adapters can
//! keep them under separate keys of a key-value store:
//!
//! * the grid document carries the board parameters, every canonical cell
//!   and every materialized cache;
//! * the player document carries the position and inventory;
//! * the history document is the ordered trail of previous positions.
//!
//! Caches that were never materialized are not stored. They regenerate on
//! demand from the luck function, which needs no saved state.

use std::collections::{HashMap, HashSet};

use geocoin_core::{Cell, Coin, LatLng, MAX_NEIGHBORHOOD_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Board, Cache, Player, World};

/// Serialized documents describing a complete session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Grid document: board parameters, cells and caches.
    pub grid: String,
    /// Player document: position and inventory.
    pub player: String,
    /// Movement history document, if one was stored.
    #[serde(default)]
    pub history: Option<String>,
}

/// Errors raised while encoding or restoring a snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A document could not be parsed or lacked required fields.
    #[error("malformed {document} document: {source}")]
    Malformed {
        /// Name of the offending document.
        document: &'static str,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A document could not be encoded.
    #[error("could not encode {document} document: {source}")]
    Encode {
        /// Name of the offending document.
        document: &'static str,
        /// Encoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// A position to be stored is not a finite coordinate.
    #[error(
        "{document} document would store non-finite position ({}, {})",
        .point.lat,
        .point.lng
    )]
    NonFinitePosition {
        /// Name of the offending document.
        document: &'static str,
        /// Position that cannot be encoded.
        point: LatLng,
    },
    /// A stored position lies outside the addressable grid.
    #[error("position ({}, {}) lies outside the grid", .0.lat, .0.lng)]
    UnaddressablePosition(LatLng),
    /// The stored visibility radius exceeds the supported window.
    #[error("visibility radius {0} exceeds the maximum of {max}", max = MAX_NEIGHBORHOOD_SIZE)]
    InvalidVisibilityRadius(u32),
    /// The stored tile width cannot describe a grid.
    #[error("tile width {0} must be finite and positive")]
    InvalidTileWidth(f64),
    /// A cell record's key disagrees with its coordinates.
    #[error("cell key '{key}' does not match coordinates {cell}")]
    CellKeyMismatch {
        /// Key stored in the record.
        key: String,
        /// Coordinates stored in the record.
        cell: Cell,
    },
    /// The same cell appears twice in the cell table.
    #[error("cell {0} is listed more than once")]
    DuplicateCell(Cell),
    /// A cache record is attached to a cell that never hosts a cache.
    #[error("cell {0} does not qualify for a cache")]
    NonQualifyingCache(Cell),
    /// The same cache appears twice in the cache table.
    #[error("cache at {0} is listed more than once")]
    DuplicateCache(Cell),
    /// The same coin is held in two places.
    #[error("coin {0} is held more than once")]
    DuplicateCoin(Coin),
    /// A coin's serial was never minted by its spawn cache.
    #[error("coin {0} was never minted by its spawn cache")]
    UnknownCoin(Coin),
    /// Some coins minted by a cache are held nowhere.
    #[error("cache at {cell} minted {minted} coins but only {held} are held")]
    MissingCoins {
        /// Cell whose cache minted the coins.
        cell: Cell,
        /// Number of coins the cache minted.
        minted: u32,
        /// Number of those coins found in caches or the inventory.
        held: u32,
    },
}

const GRID_DOCUMENT: &str = "grid";
const PLAYER_DOCUMENT: &str = "player";
const HISTORY_DOCUMENT: &str = "history";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridDocument {
    tile_width: f64,
    visibility_radius: u32,
    #[serde(default)]
    cache_spawn_probability: Option<f64>,
    cells: Vec<CellRecord>,
    caches: Vec<CacheRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellRecord {
    key: String,
    i: i32,
    j: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRecord {
    cell: Cell,
    #[serde(default)]
    next_serial: Option<u32>,
    coins: Vec<CoinRecord>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinRecord {
    spawn_i: i32,
    spawn_j: i32,
    serial: u32,
}

impl From<Coin> for CoinRecord {
    fn from(coin: Coin) -> Self {
        Self {
            spawn_i: coin.spawn_location().i(),
            spawn_j: coin.spawn_location().j(),
            serial: coin.serial(),
        }
    }
}

impl From<CoinRecord> for Coin {
    fn from(record: CoinRecord) -> Self {
        Coin::new(Cell::new(record.spawn_i, record.spawn_j), record.serial)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerDocument {
    location: LatLng,
    coins: Vec<CoinRecord>,
}

/// Encodes the complete world into its three documents.
pub fn serialize(world: &World) -> Result<SessionSnapshot, PersistenceError> {
    Ok(SessionSnapshot {
        grid: serialize_board(&world.board)?,
        player: serialize_player(&world.player)?,
        history: Some(serialize_history(&world.trail)?),
    })
}

/// Restores a world from its documents.
///
/// Cell identity is re-established by replaying the stored cell table into
/// a fresh arena, so lookups after loading are stable within the restored
/// board. The origin is not part of the snapshot and is supplied by the
/// caller.
pub fn deserialize(
    snapshot: &SessionSnapshot,
    origin: LatLng,
) -> Result<World, PersistenceError> {
    let board = deserialize_board(&snapshot.grid)?;
    let player = deserialize_player(&snapshot.player)?;
    let trail = match snapshot.history.as_deref() {
        Some(history) => deserialize_history(history)?,
        None => Vec::new(),
    };

    if board.locate(player.location()).is_none() {
        return Err(PersistenceError::UnaddressablePosition(player.location()));
    }
    ensure_single_custody(&board, &player)?;
    Ok(World::from_parts(board, player, trail, origin))
}

/// Encodes the grid document.
pub fn serialize_board(board: &Board) -> Result<String, PersistenceError> {
    let document = GridDocument {
        tile_width: board.tile_width(),
        visibility_radius: board.visibility_radius(),
        cache_spawn_probability: Some(board.cache_spawn_probability()),
        cells: board
            .known_cells()
            .iter()
            .map(|cell| CellRecord {
                key: cell.to_string(),
                i: cell.i(),
                j: cell.j(),
            })
            .collect(),
        caches: board
            .caches()
            .map(|cache| CacheRecord {
                cell: cache.location(),
                next_serial: Some(cache.next_serial()),
                coins: cache.coins().iter().copied().map(CoinRecord::from).collect(),
            })
            .collect(),
    };
    encode(GRID_DOCUMENT, &document)
}

/// Restores a board from its grid document.
pub fn deserialize_board(grid: &str) -> Result<Board, PersistenceError> {
    let document: GridDocument = decode(GRID_DOCUMENT, grid)?;
    if !document.tile_width.is_finite() || document.tile_width <= 0.0 {
        return Err(PersistenceError::InvalidTileWidth(document.tile_width));
    }
    if document.visibility_radius > MAX_NEIGHBORHOOD_SIZE {
        return Err(PersistenceError::InvalidVisibilityRadius(
            document.visibility_radius,
        ));
    }

    let mut board = Board::new(
        document.tile_width,
        document.visibility_radius,
        document
            .cache_spawn_probability
            .unwrap_or(geocoin_core::CACHE_SPAWN_PROBABILITY),
    );

    for record in document.cells {
        let cell = Cell::new(record.i, record.j);
        if record.key != cell.to_string() {
            return Err(PersistenceError::CellKeyMismatch {
                key: record.key,
                cell,
            });
        }
        if board.cell_id(cell).is_some() {
            return Err(PersistenceError::DuplicateCell(cell));
        }
        let _ = board.canonicalize(cell);
    }

    for record in document.caches {
        let cell = record.cell;
        if !board.qualifies(cell) {
            return Err(PersistenceError::NonQualifyingCache(cell));
        }
        if board.peek_cache(cell).is_some() {
            return Err(PersistenceError::DuplicateCache(cell));
        }
        let next_serial = record
            .next_serial
            .unwrap_or_else(|| board.initial_coin_count(cell));
        let coins = record.coins.into_iter().map(Coin::from).collect();
        board.insert_cache(Cache::from_parts(cell, coins, next_serial));
    }

    log::debug!(
        "restored board with {} cells and {} caches",
        board.known_cells().len(),
        board.caches().count()
    );
    Ok(board)
}

/// Encodes the player document.
pub fn serialize_player(player: &Player) -> Result<String, PersistenceError> {
    ensure_finite(PLAYER_DOCUMENT, player.location())?;
    let document = PlayerDocument {
        location: player.location(),
        coins: player.coins().iter().copied().map(CoinRecord::from).collect(),
    };
    encode(PLAYER_DOCUMENT, &document)
}

/// Restores a player from its document.
pub fn deserialize_player(player: &str) -> Result<Player, PersistenceError> {
    let document: PlayerDocument = decode(PLAYER_DOCUMENT, player)?;
    let coins = document.coins.into_iter().map(Coin::from).collect();
    Ok(Player::from_parts(document.location, coins))
}

/// Encodes the movement history document.
pub fn serialize_history(trail: &[LatLng]) -> Result<String, PersistenceError> {
    for point in trail {
        ensure_finite(HISTORY_DOCUMENT, *point)?;
    }
    encode(HISTORY_DOCUMENT, trail)
}

/// Restores the movement history from its document.
pub fn deserialize_history(history: &str) -> Result<Vec<LatLng>, PersistenceError> {
    decode(HISTORY_DOCUMENT, history)
}

fn ensure_finite(document: &'static str, point: LatLng) -> Result<(), PersistenceError> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(PersistenceError::NonFinitePosition { document, point })
    }
}

/// Every coin minted by a stored cache must be held exactly once.
fn ensure_single_custody(board: &Board, player: &Player) -> Result<(), PersistenceError> {
    let mut seen: HashSet<Coin> = HashSet::new();
    let mut held: HashMap<Cell, u32> = HashMap::new();
    let coins = board
        .caches()
        .flat_map(|cache| cache.coins().iter())
        .chain(player.coins().iter());

    for coin in coins {
        let minted = board
            .peek_cache(coin.spawn_location())
            .is_some_and(|origin| coin.serial() < origin.next_serial());
        if !minted {
            return Err(PersistenceError::UnknownCoin(*coin));
        }
        if !seen.insert(*coin) {
            return Err(PersistenceError::DuplicateCoin(*coin));
        }
        *held.entry(coin.spawn_location()).or_default() += 1;
    }

    for cache in board.caches() {
        let cell = cache.location();
        let found = held.get(&cell).copied().unwrap_or(0);
        if found != cache.next_serial() {
            return Err(PersistenceError::MissingCoins {
                cell,
                minted: cache.next_serial(),
                held: found,
            });
        }
    }
    Ok(())
}

fn encode<T: Serialize + ?Sized>(
    document: &'static str,
    value: &T,
) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|source| PersistenceError::Encode { document, source })
}

fn decode<T: for<'de> Deserialize<'de>>(
    document: &'static str,
    text: &str,
) -> Result<T, PersistenceError> {
    serde_json::from_str(text).map_err(|source| PersistenceError::Malformed { document, source })
}
