#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across Geocoin Carrier.
//!
//! This crate defines the value types and the message surface that connect
//! adapters, the authoritative world, and pure systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. The event stream is the only notification path
//! out of the world.

use std::fmt;

use serde::{Deserialize, Serialize};

mod luck;

pub use luck::luck;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Geocoin Carrier.";

/// Angular width of a single grid cell measured in degrees.
pub const TILE_DEGREES: f64 = 1e-4;

/// Chebyshev radius, in cells, of the window revealed around the player.
pub const NEIGHBORHOOD_SIZE: u32 = 8;

/// Largest visibility radius a board accepts, keeping a survey window bounded.
pub const MAX_NEIGHBORHOOD_SIZE: u32 = 1024;

/// Luck threshold below which a cell hosts a cache.
pub const CACHE_SPAWN_PROBABILITY: f64 = 0.1;

/// Multiplier applied to a cell's luck to obtain its initial coin count.
pub const CACHE_COIN_SCALE: f64 = 100.0;

/// Default starting location of the player (the Oakes College classroom).
pub const OAKES_CLASSROOM: LatLng = LatLng::new(36.989_493_795_784_01, -122.062_771_285_485_04);

/// Continuous coordinate expressed as latitude and longitude in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the coordinate shifted by the provided offsets.
    #[must_use]
    pub fn offset(self, lat: f64, lng: f64) -> Self {
        Self::new(self.lat + lat, self.lng + lng)
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Discrete grid tile identified by its row `i` and column `j`.
///
/// Cells order row-major, and render as `"i:j"`. That string is the
/// canonical key of the cell and the input to [`luck`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    i: i32,
    j: i32,
}

impl Cell {
    /// Creates a cell value for the provided coordinates.
    ///
    /// Callers that need canonical identity should go through the board's
    /// canonicalizer instead of constructing cells directly.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Row index of the cell (latitude axis).
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Column index of the cell (longitude axis).
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Returns the cell shifted by the provided row and column offsets.
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self::new(self.i.saturating_add(di), self.j.saturating_add(dj))
    }

    /// Computes the Chebyshev distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: Cell) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.i, self.j)
    }
}

/// Arena handle identifying a canonical cell within one board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    /// Creates a new cell identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Collectible token identified by the cell it spawned in and its serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coin {
    spawn_location: Cell,
    serial: u32,
}

impl Coin {
    /// Creates a coin minted in `spawn_location` with the given serial.
    #[must_use]
    pub const fn new(spawn_location: Cell, serial: u32) -> Self {
        Self {
            spawn_location,
            serial,
        }
    }

    /// Cell whose cache minted the coin.
    #[must_use]
    pub const fn spawn_location(&self) -> Cell {
        self.spawn_location
    }

    /// Serial assigned when the coin was minted, unique within its spawn cache.
    #[must_use]
    pub const fn serial(&self) -> u32 {
        self.serial
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.spawn_location, self.serial)
    }
}

/// Axis-aligned rectangle covered by a cell, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellBounds {
    /// Southern edge (inclusive).
    pub south: f64,
    /// Western edge (inclusive).
    pub west: f64,
    /// Northern edge (exclusive).
    pub north: f64,
    /// Eastern edge (exclusive).
    pub east: f64,
}

impl CellBounds {
    /// Reports whether the point lies inside the half-open rectangle.
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat < self.north
            && point.lng >= self.west
            && point.lng < self.east
    }
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward increasing latitude.
    North,
    /// Movement toward increasing longitude.
    East,
    /// Movement toward decreasing latitude.
    South,
    /// Movement toward decreasing longitude.
    West,
}

impl Direction {
    /// Row and column offsets, in cells, of a single step.
    #[must_use]
    pub const fn offsets(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Places the player at an absolute position, typically a location fix.
    MovePlayer {
        /// Position the player now occupies.
        to: LatLng,
    },
    /// Moves the player a single cell width in the provided direction.
    StepPlayer {
        /// Direction of travel.
        direction: Direction,
    },
    /// Returns the player to the world's origin.
    ResetPlayer,
    /// Reveals every cache within the visibility radius of the player.
    Survey,
    /// Moves the most recently added coin of a cache into the player's inventory.
    CollectCoin {
        /// Cell hosting the cache to withdraw from.
        cell: Cell,
    },
    /// Moves the player's most recently acquired coin into a cache.
    DepositCoin {
        /// Cell hosting the cache to deposit into.
        cell: Cell,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the player changed position.
    PlayerMoved {
        /// Previous position of the player.
        from: LatLng,
        /// Position after the move.
        to: LatLng,
    },
    /// Reports that a move target lies outside the addressable grid.
    MoveRejected {
        /// Position that was refused.
        to: LatLng,
    },
    /// Announces a cache inside the player's visibility window.
    CacheRevealed {
        /// Cell hosting the cache.
        cell: Cell,
        /// Number of coins currently held by the cache.
        coins: usize,
    },
    /// Confirms that a coin moved from a cache into the player's inventory.
    CoinCollected {
        /// Cell hosting the cache the coin left.
        cell: Cell,
        /// Coin that changed custody.
        coin: Coin,
    },
    /// Confirms that a coin moved from the player's inventory into a cache.
    CoinDeposited {
        /// Cell hosting the cache that received the coin.
        cell: Cell,
        /// Coin that changed custody.
        coin: Coin,
    },
    /// Reports that a collect request left all state untouched.
    CollectRejected {
        /// Cell named in the request.
        cell: Cell,
        /// Specific reason nothing was collected.
        reason: CollectError,
    },
    /// Reports that a deposit request left all state untouched.
    DepositRejected {
        /// Cell named in the request.
        cell: Cell,
        /// Specific reason nothing was deposited.
        reason: DepositError,
    },
}

/// Reasons a collect request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectError {
    /// The cell does not host a cache.
    NoCache,
    /// The cache holds no coins.
    EmptyCache,
}

/// Reasons a deposit request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepositError {
    /// The cell does not host a cache.
    NoCache,
    /// The player holds no coins.
    EmptyInventory,
}

#[cfg(test)]
mod tests {
    use super::{Cell, CellBounds, Coin, Direction, LatLng};

    #[test]
    fn cell_key_uses_signed_decimal() {
        assert_eq!(Cell::new(0, 0).to_string(), "0:0");
        assert_eq!(Cell::new(-12, 305).to_string(), "-12:305");
        assert_eq!(Cell::new(369_894, -1_220_628).to_string(), "369894:-1220628");
    }

    #[test]
    fn coin_renders_with_spawn_cell_and_serial() {
        let coin = Coin::new(Cell::new(-6, -5), 8);
        assert_eq!(coin.to_string(), "-6:-5#8");
    }

    #[test]
    fn coins_compare_on_both_fields() {
        let cell = Cell::new(2, -7);
        assert_eq!(Coin::new(cell, 3), Coin::new(cell, 3));
        assert_ne!(Coin::new(cell, 3), Coin::new(cell, 4));
        assert_ne!(Coin::new(cell, 3), Coin::new(Cell::new(2, -6), 3));
    }

    #[test]
    fn cells_order_row_major() {
        let mut cells = vec![Cell::new(1, -1), Cell::new(0, 5), Cell::new(0, -3)];
        cells.sort();
        assert_eq!(cells, vec![Cell::new(0, -3), Cell::new(0, 5), Cell::new(1, -1)]);
    }

    #[test]
    fn chebyshev_distance_takes_larger_axis() {
        let origin = Cell::new(-2, 4);
        assert_eq!(origin.chebyshev_distance(Cell::new(1, 5)), 3);
        assert_eq!(origin.chebyshev_distance(origin), 0);
    }

    #[test]
    fn direction_offsets_follow_compass() {
        assert_eq!(Direction::North.offsets(), (1, 0));
        assert_eq!(Direction::West.offsets(), (0, -1));
    }

    #[test]
    fn non_finite_coordinates_are_detected() {
        assert!(LatLng::new(36.9, -122.0).is_finite());
        assert!(!LatLng::new(f64::NAN, 0.0).is_finite());
        assert!(!LatLng::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn bounds_are_half_open() {
        let bounds = CellBounds {
            south: 0.0,
            west: 0.0,
            north: 1.0,
            east: 1.0,
        };
        assert!(bounds.contains(LatLng::new(0.0, 0.5)));
        assert!(!bounds.contains(LatLng::new(1.0, 0.5)));
        assert!(!bounds.contains(LatLng::new(0.5, 1.0)));
    }

    #[test]
    fn coin_round_trips_through_bincode() {
        let coin = Coin::new(Cell::new(-7, 0), 6);
        let bytes = bincode::serialize(&coin).expect("serialize");
        let restored: Coin = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, coin);
    }
}
