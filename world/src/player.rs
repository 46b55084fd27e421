//! Coin holder state for the single player of a world.

use geocoin_core::{Coin, LatLng};

/// Player position and coin inventory.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    location: LatLng,
    coins: Vec<Coin>,
}

impl Player {
    /// Creates a player standing at `location` with an empty inventory.
    #[must_use]
    pub fn new(location: LatLng) -> Self {
        Self {
            location,
            coins: Vec::new(),
        }
    }

    pub(crate) fn from_parts(location: LatLng, coins: Vec<Coin>) -> Self {
        Self { location, coins }
    }

    /// Current position of the player.
    #[must_use]
    pub const fn location(&self) -> LatLng {
        self.location
    }

    /// Moves the player to `location`.
    pub fn set_location(&mut self, location: LatLng) {
        self.location = location;
    }

    /// Inventory in acquisition order, oldest first.
    #[must_use]
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Number of coins held.
    #[must_use]
    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Removes and returns the most recently acquired coin.
    pub fn take_coin(&mut self) -> Option<Coin> {
        self.coins.pop()
    }

    /// Adds a coin to the inventory.
    pub fn give_coin(&mut self, coin: Coin) {
        self.coins.push(coin);
    }
}
