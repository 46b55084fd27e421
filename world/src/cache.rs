//! Coin pools hosted by qualifying cells.

use geocoin_core::{Cell, Coin};

/// Mutable pool of coins attached to a single qualifying cell.
///
/// Coins behave as a stack: deposits push onto the end and withdrawals pop
/// the most recently added coin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cache {
    location: Cell,
    coins: Vec<Coin>,
    next_serial: u32,
}

impl Cache {
    /// Mints `count` coins with serials `0..count`, all spawned in `location`.
    pub(crate) fn spawn(location: Cell, count: u32) -> Self {
        let coins = (0..count).map(|serial| Coin::new(location, serial)).collect();
        Self {
            location,
            coins,
            next_serial: count,
        }
    }

    pub(crate) fn from_parts(location: Cell, coins: Vec<Coin>, next_serial: u32) -> Self {
        Self {
            location,
            coins,
            next_serial,
        }
    }

    /// Cell hosting the cache.
    #[must_use]
    pub const fn location(&self) -> Cell {
        self.location
    }

    /// Coins currently held, oldest first.
    #[must_use]
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Number of coins currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// Reports whether the cache holds no coins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Serial the cache would assign to its next minted coin.
    ///
    /// Never decreases, even after the cache is drained.
    #[must_use]
    pub const fn next_serial(&self) -> u32 {
        self.next_serial
    }

    /// Removes and returns the most recently added coin.
    ///
    /// Returns `None` without touching the cache when it is empty.
    pub fn withdraw(&mut self) -> Option<Coin> {
        self.coins.pop()
    }

    /// Appends a coin to the cache, keeping its provenance intact.
    pub fn deposit(&mut self, coin: Coin) {
        self.coins.push(coin);
    }
}
