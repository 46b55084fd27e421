//! Tunable gameplay parameters used when building a fresh world.

use geocoin_core::{
    LatLng, CACHE_SPAWN_PROBABILITY, NEIGHBORHOOD_SIZE, OAKES_CLASSROOM, TILE_DEGREES,
};
use serde::{Deserialize, Serialize};

/// Parameters applied to newly created worlds.
///
/// Restored worlds keep the parameters stored in their snapshot; only
/// `origin` is taken from configuration on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of a single cell in degrees.
    pub tile_degrees: f64,
    /// Chebyshev radius of the visibility window, in cells.
    pub neighborhood_size: u32,
    /// Luck threshold below which a cell hosts a cache.
    pub cache_spawn_probability: f64,
    /// Starting and reset location of the player.
    pub origin: LatLng,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_degrees: TILE_DEGREES,
            neighborhood_size: NEIGHBORHOOD_SIZE,
            cache_spawn_probability: CACHE_SPAWN_PROBABILITY,
            origin: OAKES_CLASSROOM,
        }
    }
}
