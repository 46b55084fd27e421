#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Geocoin Carrier.

mod board;
mod cache;
mod config;
pub mod persistence;
mod player;

pub use board::Board;
pub use cache::Cache;
pub use config::GameConfig;
pub use player::Player;

use geocoin_core::{
    Cell, CollectError, Command, DepositError, Event, LatLng, WELCOME_BANNER,
};

/// Represents the authoritative Geocoin Carrier world state.
#[derive(Clone, Debug)]
pub struct World {
    banner: &'static str,
    board: Board,
    player: Player,
    trail: Vec<LatLng>,
    origin: LatLng,
}

impl World {
    /// Creates a new world using the default gameplay configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&GameConfig::default())
    }

    /// Creates a fresh world with the player standing at the configured origin.
    #[must_use]
    pub fn with_config(config: &GameConfig) -> Self {
        Self::from_parts(
            Board::from_config(config),
            Player::new(config.origin),
            Vec::new(),
            config.origin,
        )
    }

    pub(crate) fn from_parts(
        board: Board,
        player: Player,
        trail: Vec<LatLng>,
        origin: LatLng,
    ) -> Self {
        Self {
            banner: WELCOME_BANNER,
            board,
            player,
            trail,
            origin,
        }
    }

    /// Mutable access to the grid for callers that query caches directly.
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Mutable access to the player's inventory and position.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    fn move_player(&mut self, to: LatLng, out_events: &mut Vec<Event>) {
        if self.board.locate(to).is_none() {
            log::warn!("refusing move to ({}, {}) outside the grid", to.lat, to.lng);
            out_events.push(Event::MoveRejected { to });
            return;
        }

        let from = self.player.location();
        self.trail.push(from);
        self.player.set_location(to);
        out_events.push(Event::PlayerMoved { from, to });
    }

    fn survey(&mut self, out_events: &mut Vec<Event>) {
        let cells = self.board.cells_near(self.player.location());
        let before = out_events.len();
        for cell in cells {
            if let Some(cache) = self.board.cache_for(cell) {
                out_events.push(Event::CacheRevealed {
                    cell,
                    coins: cache.len(),
                });
            }
        }
        log::debug!(
            "survey around {} revealed {} caches",
            self.board.cell_at(self.player.location()),
            out_events.len() - before
        );
    }

    fn collect(&mut self, cell: Cell, out_events: &mut Vec<Event>) {
        let outcome = match self.board.cache_for(cell) {
            None => Err(CollectError::NoCache),
            Some(cache) => cache.withdraw().ok_or(CollectError::EmptyCache),
        };

        match outcome {
            Ok(coin) => {
                self.player.give_coin(coin);
                out_events.push(Event::CoinCollected { cell, coin });
            }
            Err(reason) => out_events.push(Event::CollectRejected { cell, reason }),
        }
    }

    fn deposit(&mut self, cell: Cell, out_events: &mut Vec<Event>) {
        if !self.board.qualifies(cell) {
            out_events.push(Event::DepositRejected {
                cell,
                reason: DepositError::NoCache,
            });
            return;
        }

        let Some(coin) = self.player.take_coin() else {
            out_events.push(Event::DepositRejected {
                cell,
                reason: DepositError::EmptyInventory,
            });
            return;
        };

        let _ = self.board.mutate_cache(cell, |cache| cache.deposit(coin));
        out_events.push(Event::CoinDeposited { cell, coin });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { to } => world.move_player(to, out_events),
        Command::StepPlayer { direction } => {
            let (di, dj) = direction.offsets();
            let width = world.board.tile_width();
            let to = world
                .player
                .location()
                .offset(f64::from(di) * width, f64::from(dj) * width);
            world.move_player(to, out_events);
        }
        Command::ResetPlayer => {
            let origin = world.origin;
            world.move_player(origin, out_events);
        }
        Command::Survey => world.survey(out_events),
        Command::CollectCoin { cell } => world.collect(cell, out_events),
        Command::DepositCoin { cell } => world.deposit(cell, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use geocoin_core::{Coin, LatLng};

    use super::{Board, Cache, Player, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn board(world: &World) -> &Board {
        &world.board
    }

    /// Provides read-only access to the player.
    #[must_use]
    pub fn player(world: &World) -> &Player {
        &world.player
    }

    /// Prior player positions, oldest first.
    #[must_use]
    pub fn trail(world: &World) -> &[LatLng] {
        &world.trail
    }

    /// Location the player returns to on reset.
    #[must_use]
    pub fn origin(world: &World) -> LatLng {
        world.origin
    }

    /// Materialized caches inside the player's visibility window, row-major.
    #[must_use]
    pub fn visible_caches(world: &World) -> Vec<&Cache> {
        let board = &world.board;
        let centre = board.cell_at(world.player.location());
        board
            .caches()
            .filter(|cache| cache.location().chebyshev_distance(centre) <= board.visibility_radius())
            .collect()
    }

    /// Every coin in custody of a cache or the player.
    #[must_use]
    pub fn all_coins(world: &World) -> Vec<Coin> {
        world
            .board
            .caches()
            .flat_map(|cache| cache.coins().iter().copied())
            .chain(world.player.coins().iter().copied())
            .collect()
    }
}
