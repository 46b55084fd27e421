use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use geocoin_core::MAX_NEIGHBORHOOD_SIZE;
use geocoin_world::GameConfig;
use serde::Deserialize;

/// Settings read from the optional TOML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    /// Directory holding the persisted session, unless overridden on the command line.
    pub(crate) save_dir: Option<PathBuf>,
    /// Gameplay parameters applied to fresh worlds.
    pub(crate) game: GameConfig,
}

impl CliConfig {
    /// Loads configuration from `path`, or defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse config toml contents")?;

        let game = &config.game;
        if !game.tile_degrees.is_finite() || game.tile_degrees <= 0.0 {
            bail!("tile_degrees must be positive, got {}", game.tile_degrees);
        }
        if !(0.0..=1.0).contains(&game.cache_spawn_probability) {
            bail!(
                "cache_spawn_probability must lie within 0..=1, got {}",
                game.cache_spawn_probability
            );
        }
        if game.neighborhood_size > MAX_NEIGHBORHOOD_SIZE {
            bail!(
                "neighborhood_size must not exceed {MAX_NEIGHBORHOOD_SIZE}, got {}",
                game.neighborhood_size
            );
        }
        if !game.origin.is_finite() {
            bail!("origin must be a finite coordinate");
        }
        Ok(config)
    }
}
