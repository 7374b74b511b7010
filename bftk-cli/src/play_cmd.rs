//! Play commands - apply one action of the current faction to a saved match
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_move(), run_attack(), run_recruit(), run_end_turn()
//! - Level 2: with_match() - load, apply, save
//! - Level 3: describe_outcome()
//! - Level 4: argument types
//!
//! A rejected action exits with an error before anything is written.

use anyhow::{Context, Result};
use clap::Args;

use bftk_core::{Archetype, CombatOutcome, GameState, Position};

use crate::SaveArgs;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Tile of the unit to move, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub from: Position,

    /// Destination tile, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub to: Position,
}

#[derive(Args, Debug)]
pub struct AttackArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Tile of the attacking unit, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub from: Position,

    /// Tile of the defending unit, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub to: Position,
}

#[derive(Args, Debug)]
pub struct RecruitArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Unit type: soldier, knight or archer
    #[arg(long)]
    pub unit: Archetype,
}

#[derive(Args, Debug)]
pub struct EndTurnArgs {
    #[command(flatten)]
    pub save: SaveArgs,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run move command
pub fn run_move(args: MoveArgs) -> Result<()> {
    with_match(&args.save, |game| {
        game.move_unit(args.from, args.to).context("Move rejected")?;
        println!("Moved {} -> {}", args.from, args.to);
        Ok(())
    })
}

/// Run attack command
pub fn run_attack(args: AttackArgs) -> Result<()> {
    with_match(&args.save, |game| {
        let outcome = game.attack(args.from, args.to).context("Attack rejected")?;
        println!("{}", describe_outcome(&outcome, args.from, args.to));
        Ok(())
    })
}

/// Run recruit command
pub fn run_recruit(args: RecruitArgs) -> Result<()> {
    with_match(&args.save, |game| {
        let id = game.recruit(args.unit).context("Recruit rejected")?;
        if let Some(unit) = game.unit(id) {
            println!("Recruited {} at {}", unit.archetype, unit.pos);
        }
        Ok(())
    })
}

/// Run end-turn command
pub fn run_end_turn(args: EndTurnArgs) -> Result<()> {
    with_match(&args.save, |game| {
        if game.is_over() {
            println!("Game is over; nothing to do");
            return Ok(());
        }
        game.end_turn();
        Ok(())
    })
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Load the match, apply `action` and write the match back if it succeeded
fn with_match<F>(args: &SaveArgs, action: F) -> Result<()>
where
    F: FnOnce(&mut GameState) -> Result<()>,
{
    let config = args.load_config()?;
    let mut game = GameState::resume_from_path(&args.save, &config)?;

    action(&mut game)?;

    game.save_to_path(&args.save)?;
    report_state(&game);
    Ok(())
}

fn report_state(game: &GameState) {
    match game.winner() {
        Some(winner) => println!("Game over: {} wins", game.player(winner).name),
        None => {
            let current = game.current_faction();
            println!(
                "Turn {}: {} to move ({} resources)",
                game.turn(),
                game.player(current).name,
                game.player(current).resources
            );
        }
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn describe_outcome(outcome: &CombatOutcome, from: Position, to: Position) -> String {
    let result = if outcome.attacker_wins {
        format!("defender destroyed, attacker advances to {}", to)
    } else {
        "defender holds".to_string()
    };
    format!(
        "Attack {} -> {}: rolled {} vs {}, {}",
        from, to, outcome.attack_roll, outcome.defense_roll, result
    )
}
