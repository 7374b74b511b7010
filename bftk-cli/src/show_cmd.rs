//! Show and options commands - read-only views of a saved match
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_show(), run_options() - orchestration
//! - Level 2: print_board(), print_status(), print_options()
//! - Level 3: render_board(), sorted()
//! - Level 4: cell glyphs

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use bftk_core::{Archetype, Faction, GameState, Position, Terrain, Tile};

use crate::SaveArgs;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Print match status as JSON instead of a board
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Tile of the unit to inspect, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub at: Position,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run show command
pub fn run_show(args: ShowArgs) -> Result<()> {
    let config = args.save.load_config()?;
    let game = GameState::resume_from_path(&args.save.save, &config)?;

    if args.json {
        print_json_status(&game)?;
    } else {
        print_board(&game);
        print_status(&game);
    }
    Ok(())
}

/// Run options command
pub fn run_options(args: OptionsArgs) -> Result<()> {
    let config = args.save.load_config()?;
    let game = GameState::resume_from_path(&args.save.save, &config)?;

    let unit = game
        .unit_at(args.at)
        .with_context(|| format!("No unit at {}", args.at))?;

    let moves = sorted(game.reachable_moves(unit));
    let targets = sorted(game.attack_targets(unit));

    if args.json {
        #[derive(Serialize)]
        struct JsonOptions {
            unit: String,
            faction: Faction,
            has_acted: bool,
            moves: Vec<(i32, i32)>,
            targets: Vec<(i32, i32)>,
        }

        let output = JsonOptions {
            unit: unit.archetype.tag().to_string(),
            faction: unit.faction,
            has_acted: unit.has_acted,
            moves: moves.iter().map(|p| (p.x, p.y)).collect(),
            targets: targets.iter().map(|p| (p.x, p.y)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_options(&game, args.at, &moves, &targets);
    }
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn print_board(game: &GameState) {
    print!("{}", render_board(game));
    println!("Legend: . plains  ^ forest  $ mine  + temple  # castle");
    println!("        owner 1/2 after the terrain, units S K A (faction A) s k a (faction B)");
}

fn print_status(game: &GameState) {
    println!();
    match game.winner() {
        Some(winner) => println!(
            "Game over on turn {}: {} ({}) wins",
            game.turn(),
            game.player(winner).name,
            winner
        ),
        None => println!(
            "Turn {}: {} to move",
            game.turn(),
            game.player(game.current_faction()).name
        ),
    }

    for faction in [Faction::A, Faction::B] {
        let player = game.player(faction);
        let units = game.units().filter(|u| u.faction == faction).count();
        let ready = game
            .units()
            .filter(|u| u.faction == faction && !u.has_acted)
            .count();
        println!(
            "  {:<14} {:>4} resources, {} units ({} ready)",
            player.name, player.resources, units, ready
        );
    }
}

fn print_json_status(game: &GameState) -> Result<()> {
    #[derive(Serialize)]
    struct JsonPlayer {
        faction: Faction,
        name: String,
        resources: i32,
        units: usize,
    }

    #[derive(Serialize)]
    struct JsonStatus {
        turn: u32,
        current: Faction,
        game_over: bool,
        winner: Option<Faction>,
        players: Vec<JsonPlayer>,
    }

    let output = JsonStatus {
        turn: game.turn(),
        current: game.current_faction(),
        game_over: game.is_over(),
        winner: game.winner(),
        players: [Faction::A, Faction::B]
            .into_iter()
            .map(|faction| {
                let player = game.player(faction);
                JsonPlayer {
                    faction,
                    name: player.name.clone(),
                    resources: player.resources,
                    units: game.units().filter(|u| u.faction == faction).count(),
                }
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_options(game: &GameState, at: Position, moves: &[Position], targets: &[Position]) {
    let join = |list: &[Position]| {
        if list.is_empty() {
            "none".to_string()
        } else {
            list.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ")
        }
    };

    if let Some(unit) = game.unit_at(at) {
        let state = if unit.has_acted { "acted" } else { "ready" };
        println!("{} {} at {} ({})", unit.faction, unit.archetype, at, state);
    }
    println!("  moves:   {}", join(moves));
    println!("  targets: {}", join(targets));
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Board as text, one row per line with x/y labels
pub(crate) fn render_board(game: &GameState) -> String {
    let board = game.board();
    let mut out = String::from("   ");
    for x in 0..board.width() {
        out.push_str(&format!("{:<3}", x % 100));
    }
    out.push('\n');

    for y in 0..board.height() {
        out.push_str(&format!("{:>2} ", y % 100));
        for x in 0..board.width() {
            let pos = Position::new(x, y);
            let tile = &board[pos];
            out.push(terrain_glyph(tile.terrain));
            out.push(owner_glyph(tile));
            out.push(game.unit_at(pos).map_or(' ', |u| unit_glyph(u.archetype, u.faction)));
        }
        out.push('\n');
    }
    out
}

fn sorted(set: impl IntoIterator<Item = Position>) -> Vec<Position> {
    let mut list: Vec<_> = set.into_iter().collect();
    list.sort_by_key(|p| (p.y, p.x));
    list
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn terrain_glyph(terrain: Terrain) -> char {
    match terrain {
        Terrain::Plains => '.',
        Terrain::Forest => '^',
        Terrain::Mine => '$',
        Terrain::Temple => '+',
        Terrain::Castle => '#',
    }
}

fn owner_glyph(tile: &Tile) -> char {
    match tile.owner {
        Some(Faction::A) => '1',
        Some(Faction::B) => '2',
        None => ' ',
    }
}

fn unit_glyph(archetype: Archetype, faction: Faction) -> char {
    let glyph = match archetype {
        Archetype::Melee => 'S',
        Archetype::Mounted => 'K',
        Archetype::Ranged => 'A',
    };
    match faction {
        Faction::A => glyph,
        Faction::B => glyph.to_ascii_lowercase(),
    }
}
