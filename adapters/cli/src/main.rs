#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Geocoin Carrier one turn per invocation.

mod config;
mod session_transfer;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geocoin_core::{Cell, CollectError, Command, DepositError, Direction, Event, LatLng};
use geocoin_storage::{self as storage, DirectoryStore, KeyValueStore};
use geocoin_system_navigation::{Navigation, NavigationInput};
use geocoin_world::{persistence, query, World};

use crate::config::CliConfig;

/// Directory used for the session when neither flag nor config names one.
const DEFAULT_SAVE_DIR: &str = ".geocoin";

#[derive(Debug, Parser)]
#[command(name = "geocoin", version)]
#[command(about = "Carry coins between grid caches around a real-world location")]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the saved session
    #[arg(long)]
    save_dir: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Show the player's position and inventory
    Status,
    /// Reveal the caches around the player
    Look,
    /// Move one cell in the given heading
    Step {
        #[arg(value_enum)]
        heading: Heading,
    },
    /// Jump to a reported position, as a location fix would
    #[command(allow_negative_numbers = true)]
    Goto {
        #[arg(value_parser = parse_coordinate)]
        lat: f64,
        #[arg(value_parser = parse_coordinate)]
        lng: f64,
    },
    /// Return to the starting location
    Home,
    /// Take one coin from the cache at cell i:j
    #[command(allow_negative_numbers = true)]
    Collect { i: i32, j: i32 },
    /// Leave one coin in the cache at cell i:j
    #[command(allow_negative_numbers = true)]
    Deposit { i: i32, j: i32 },
    /// Discard the saved session and start over
    Reset,
    /// Print the session as a single-line transfer string
    Export,
    /// Replace the saved session with a transfer string
    Import { snapshot: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Heading {
    North,
    East,
    South,
    West,
}

impl From<Heading> for Direction {
    fn from(heading: Heading) -> Self {
        match heading {
            Heading::North => Direction::North,
            Heading::East => Direction::East,
            Heading::South => Direction::South,
            Heading::West => Direction::West,
        }
    }
}

fn parse_coordinate(value: &str) -> Result<f64, String> {
    let coordinate: f64 = value
        .parse()
        .map_err(|error| format!("'{value}' is not a number: {error}"))?;
    if coordinate.is_finite() {
        Ok(coordinate)
    } else {
        Err(format!("'{value}' is not a finite coordinate"))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    let save_dir = cli
        .save_dir
        .or_else(|| config.save_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR));
    let mut store = DirectoryStore::new(save_dir);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli.action, &config, &mut store, &mut out)
}

/// Executes a single action against the session held in `store`.
fn run(
    action: Action,
    config: &CliConfig,
    store: &mut dyn KeyValueStore,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        Action::Reset => {
            let world = storage::reset_session(store, &config.game)?;
            writeln!(out, "{}", query::welcome_banner(&world))?;
            return save(store, &world);
        }
        Action::Import { snapshot } => {
            let snapshot = session_transfer::decode(&snapshot)?;
            let world = persistence::deserialize(&snapshot, config.game.origin)
                .context("transfer string does not describe a valid session")?;
            save(store, &world)?;
            writeln!(out, "Session imported.")?;
            return report_inventory(&world, out);
        }
        _ => {}
    }

    let outcome = storage::load_session(store, &config.game)?;
    let restored = outcome.is_restored();
    let mut world = outcome.into_world();
    if !restored {
        log::info!("starting a fresh session");
        writeln!(out, "{}", query::welcome_banner(&world))?;
    }

    let commands = match action {
        Action::Status => {
            report_position(&world, out)?;
            return report_inventory(&world, out);
        }
        Action::Export => {
            let snapshot = persistence::serialize(&world)?;
            writeln!(out, "{}", session_transfer::encode(&snapshot)?)?;
            return Ok(());
        }
        Action::Look => vec![Command::Survey],
        Action::Step { heading } => navigate(
            Navigation::new(),
            NavigationInput::Step(heading.into()),
        ),
        Action::Goto { lat, lng } => navigate(
            Navigation::tracking(),
            NavigationInput::PositionFix(LatLng::new(lat, lng)),
        ),
        Action::Home => navigate(Navigation::new(), NavigationInput::Reset),
        Action::Collect { i, j } => vec![Command::CollectCoin {
            cell: Cell::new(i, j),
        }],
        Action::Deposit { i, j } => vec![Command::DepositCoin {
            cell: Cell::new(i, j),
        }],
        Action::Reset | Action::Import { .. } => Vec::new(),
    };

    let mut events = Vec::new();
    for command in commands {
        geocoin_world::apply(&mut world, command, &mut events);
    }
    for event in &events {
        report_event(&world, event, out)?;
    }

    save(store, &world)
}

fn navigate(mut navigation: Navigation, input: NavigationInput) -> Vec<Command> {
    let mut commands = Vec::new();
    navigation.handle(&[input], &mut commands);
    commands
}

fn save(store: &mut dyn KeyValueStore, world: &World) -> Result<()> {
    storage::save_session(store, world).context("failed to save session")
}

fn report_event(world: &World, event: &Event, out: &mut dyn Write) -> io::Result<()> {
    match event {
        Event::PlayerMoved { to, .. } => {
            let cell = query::board(world).cell_at(*to);
            writeln!(out, "Moved to {cell} ({:.6}, {:.6}).", to.lat, to.lng)
        }
        Event::MoveRejected { to } => writeln!(
            out,
            "Cannot move to ({}, {}): outside the map.",
            to.lat, to.lng
        ),
        Event::CacheRevealed { cell, coins } => writeln!(out, "Cache {cell}: {coins} coins."),
        Event::CoinCollected { coin, .. } => writeln!(out, "Received coin {coin}."),
        Event::CoinDeposited { coin, .. } => writeln!(out, "Left coin {coin}."),
        Event::CollectRejected { cell, reason } => match reason {
            CollectError::NoCache => writeln!(out, "No cache at {cell}."),
            CollectError::EmptyCache => writeln!(out, "Cache {cell} is empty."),
        },
        Event::DepositRejected { cell, reason } => match reason {
            DepositError::NoCache => writeln!(out, "No cache at {cell}."),
            DepositError::EmptyInventory => writeln!(out, "You don't have any coins to leave."),
        },
    }
}

fn report_position(world: &World, out: &mut dyn Write) -> io::Result<()> {
    let location = query::player(world).location();
    let cell = query::board(world).cell_at(location);
    writeln!(
        out,
        "Player at {cell} ({:.6}, {:.6}).",
        location.lat, location.lng
    )
}

fn report_inventory(world: &World, out: &mut dyn Write) -> Result<()> {
    let coins = query::player(world).coins();
    if coins.is_empty() {
        writeln!(out, "You don't have any coins! Collect some from caches.")?;
        return Ok(());
    }

    let listed: Vec<String> = coins.iter().map(ToString::to_string).collect();
    writeln!(out, "Player has {} coins: {}.", coins.len(), listed.join(", "))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocoin_storage::{MemoryStore, GRID_KEY, PLAYER_KEY};

    fn execute(action: Action, store: &mut MemoryStore) -> String {
        let mut out = Vec::new();
        run(action, &CliConfig::default(), store, &mut out).expect("action succeeds");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn fresh_session_prints_banner_once() {
        let mut store = MemoryStore::new();

        let first = execute(Action::Status, &mut store);
        assert!(first.starts_with("Welcome to Geocoin Carrier.\n"));
        assert!(first.contains("Player at 369894:-1220628"));
        assert!(first.contains("You don't have any coins! Collect some from caches."));

        let _ = execute(Action::Look, &mut store);
        let second = execute(Action::Status, &mut store);
        assert!(!second.contains("Welcome"));
    }

    #[test]
    fn look_reveals_and_persists_caches() {
        let mut store = MemoryStore::new();

        let output = execute(Action::Look, &mut store);
        assert_eq!(output.matches("Cache ").count(), 34);
        assert!(output.contains("Cache 369886:-1220636: 9 coins."));
        assert!(store.get(GRID_KEY).expect("get").is_some());
        assert!(store.get(PLAYER_KEY).expect("get").is_some());
    }

    #[test]
    fn collect_and_deposit_move_one_coin() {
        let mut store = MemoryStore::new();

        let collected = execute(Action::Collect { i: 369_886, j: -1_220_636 }, &mut store);
        assert!(collected.contains("Received coin 369886:-1220636#8."));

        let status = execute(Action::Status, &mut store);
        assert!(status.contains("Player has 1 coins: 369886:-1220636#8."));

        let deposited = execute(Action::Deposit { i: 369_886, j: -1_220_636 }, &mut store);
        assert!(deposited.contains("Left coin 369886:-1220636#8."));

        let refused = execute(Action::Deposit { i: 369_886, j: -1_220_636 }, &mut store);
        assert!(refused.contains("You don't have any coins to leave."));
    }

    #[test]
    fn collect_from_empty_cell_is_reported() {
        let mut store = MemoryStore::new();
        let output = execute(Action::Collect { i: 0, j: 0 }, &mut store);
        assert!(output.contains("No cache at 0:0."));
    }

    #[test]
    fn stepping_moves_and_surveys() {
        let mut store = MemoryStore::new();

        let output = execute(
            Action::Step {
                heading: Heading::North,
            },
            &mut store,
        );
        assert!(output.contains("Moved to "));
        assert!(output.contains("Cache "));

        let home = execute(Action::Home, &mut store);
        assert!(home.contains("Moved to 369894:-1220628"));
    }

    #[test]
    fn export_then_import_restores_inventory() {
        let mut store = MemoryStore::new();
        let _ = execute(Action::Collect { i: 369_886, j: -1_220_636 }, &mut store);
        let exported = execute(Action::Export, &mut store);
        let line = exported.trim().to_owned();
        assert!(line.starts_with("geocoin:v1:"));

        let mut other = MemoryStore::new();
        let imported = execute(Action::Import { snapshot: line }, &mut other);
        assert!(imported.contains("Player has 1 coins: 369886:-1220636#8."));

        let status = execute(Action::Status, &mut other);
        assert!(!status.contains("Welcome"));
        assert!(status.contains("Player has 1 coins"));
    }

    #[test]
    fn import_rejects_garbage() {
        let mut store = MemoryStore::new();
        let mut out = Vec::new();
        let result = run(
            Action::Import {
                snapshot: "geocoin:v1:@@@".to_owned(),
            },
            &CliConfig::default(),
            &mut store,
            &mut out,
        );
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn reset_forgets_inventory() {
        let mut store = MemoryStore::new();
        let _ = execute(Action::Collect { i: 369_886, j: -1_220_636 }, &mut store);

        let output = execute(Action::Reset, &mut store);
        assert!(output.starts_with("Welcome to Geocoin Carrier."));

        let status = execute(Action::Status, &mut store);
        assert!(status.contains("You don't have any coins!"));
    }

    #[test]
    fn non_finite_coordinates_are_refused() {
        for value in ["NaN", "inf", "-inf"] {
            let parsed = Cli::try_parse_from(["geocoin", "goto", value, "0"]);
            assert!(parsed.is_err(), "{value} accepted");
        }
    }

    #[test]
    fn far_goto_keeps_the_session() {
        let mut store = MemoryStore::new();
        let _ = execute(Action::Collect { i: 369_886, j: -1_220_636 }, &mut store);

        let output = execute(Action::Goto { lat: 1e6, lng: 0.0 }, &mut store);
        assert!(output.contains("Cannot move to"));

        let status = execute(Action::Status, &mut store);
        assert!(!status.contains("Welcome"));
        assert!(status.contains("Player at 369894:-1220628"));
        assert!(status.contains("Player has 1 coins: 369886:-1220636#8."));
    }

    #[test]
    fn negative_cell_arguments_parse() {
        let cli = Cli::try_parse_from(["geocoin", "collect", "-6", "-5"]).expect("parses");
        assert!(matches!(cli.action, Action::Collect { i: -6, j: -5 }));

        let cli = Cli::try_parse_from(["geocoin", "goto", "36.9", "-122.0"]).expect("parses");
        assert!(matches!(cli.action, Action::Goto { .. }));
    }
}
